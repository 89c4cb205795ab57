//! Middleware for the web frontend.

pub mod auth;
pub mod cors;
pub mod security;

pub use auth::{
    jwt_auth, AuthRejection, AuthUser, JwtClaims, JwtState, OptionalAuthUser, ACCESS_COOKIE,
    REFRESH_COOKIE,
};
pub use cors::create_cors_layer;
pub use security::security_headers;

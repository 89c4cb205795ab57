//! JWT session middleware.
//!
//! The access token travels in the `access_token_cookie` cookie. Pages that
//! require a session redirect to `/login` when the cookie is missing or
//! invalid, and to `/refresh` when it has only expired.

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie carrying the access token.
pub const ACCESS_COOKIE: &str = "access_token_cookie";

/// Cookie carrying the opaque refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token_cookie";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    /// Email address of the user.
    pub email: String,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Decoding side of the JWT configuration.
#[derive(Clone)]
pub struct JwtState {
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }

    /// Decode and validate an access token.
    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthRejection> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthRejection::Expired,
                _ => {
                    tracing::debug!("JWT validation failed: {}", e);
                    AuthRejection::Invalid
                }
            })
    }
}

/// Why a request carries no usable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No access cookie.
    Missing,
    /// Signature or claims are wrong.
    Invalid,
    /// Well-formed but past its expiry.
    Expired,
    /// The router was built without the JWT middleware.
    NotConfigured,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Missing | AuthRejection::Invalid => {
                Redirect::to("/login").into_response()
            }
            AuthRejection::Expired => Redirect::to("/refresh").into_response(),
            AuthRejection::NotConfigured => {
                tracing::error!("JWT state not configured");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn claims_from_parts(parts: &Parts) -> Result<JwtClaims, AuthRejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AuthRejection::Missing)?;

    let jwt_state = parts
        .extensions
        .get::<Arc<JwtState>>()
        .ok_or(AuthRejection::NotConfigured)?;

    jwt_state.verify(&token)
}

/// Extractor for signed-in users.
///
/// Handlers taking this extractor are only reached with a valid access
/// token; everyone else is redirected.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { claims_from_parts(parts).map(AuthUser) })
    }
}

/// Optional session extractor.
///
/// Similar to AuthUser but yields `None` instead of redirecting.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<JwtClaims>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move { Ok(OptionalAuthUser(claims_from_parts(parts).ok())) })
    }
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}

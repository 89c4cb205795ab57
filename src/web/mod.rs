//! Web frontend for mureader.
//!
//! Server-rendered pages over axum. Sessions are JWT access tokens plus
//! stored refresh tokens, both carried in cookies.

pub mod error;
pub mod flash;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::WebError;
pub use handlers::AppState;
pub use router::{create_health_router, create_router};
pub use server::WebServer;

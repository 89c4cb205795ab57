//! Router configuration for the web frontend.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    feeds_page, index, last, like, liked, login, login_page, logout, news, refresh,
    refresh_feed, register, register_page, subscribe, unlike, unsubscribe, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, security_headers, JwtState};

/// Create the page router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let auth_routes = Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/refresh", get(refresh));

    let reading_routes = Router::new()
        .route("/", get(index))
        .route("/last", get(last))
        .route("/news", get(news))
        .route("/liked", get(liked))
        .route("/entries/:id/like", post(like))
        .route("/entries/:id/unlike", post(unlike));

    let feed_routes = Router::new()
        .route("/feeds", get(feeds_page).post(subscribe))
        .route("/feeds/:id/unsubscribe", post(unsubscribe))
        .route("/feeds/:id/refresh", post(refresh_feed));

    let jwt_state_for_middleware = jwt_state.clone();

    Router::new()
        .merge(auth_routes)
        .merge(reading_routes)
        .merge(feed_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state_for_middleware.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_router() {
        let response = create_health_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }
}

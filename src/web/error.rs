//! Error handling for the web frontend.
//!
//! Failures the reader can act on become a redirect with a flash message;
//! missing resources and bad input render an error page; anything else is
//! logged and shown as a generic 500 page.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use super::flash::redirect_with_flash;
use crate::template::{PageRenderer, TemplateContext};
use crate::ReaderError;

/// Error type returned by page handlers.
#[derive(Debug)]
pub enum WebError {
    /// Redirect to `to`, showing `message` there.
    Flash { to: String, message: String },
    /// 400 page.
    BadRequest(String),
    /// 404 page.
    NotFound(String),
    /// 500 page; details have already been logged.
    Internal,
}

impl WebError {
    /// Create a redirect-with-message error.
    pub fn flash(to: impl Into<String>, message: impl Into<String>) -> Self {
        WebError::Flash {
            to: to.into(),
            message: message.into(),
        }
    }

    /// Create an internal error, logging the cause.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", context, err);
        WebError::Internal
    }

    /// Convert a library error, sending user-facing failures back to `to`.
    ///
    /// Validation, feed and authentication errors become flash messages;
    /// everything else converts as with `From`.
    pub fn redirect_to(to: &str) -> impl FnOnce(ReaderError) -> WebError + '_ {
        move |err| match err {
            ReaderError::Validation(msg) | ReaderError::Auth(msg) => WebError::flash(to, msg),
            ReaderError::Feed(_) => WebError::flash(to, capitalize(&err.to_string())),
            other => WebError::from(other),
        }
    }

    /// HTTP status of the response this error produces.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::Flash { .. } => StatusCode::SEE_OTHER,
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReaderError> for WebError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::NotFound(what) => {
                WebError::NotFound(capitalize(&format!("{what} not found")))
            }
            ReaderError::Validation(msg) => WebError::BadRequest(msg),
            ReaderError::Auth(msg) => WebError::flash("/login", msg),
            other => WebError::internal("Internal error", other),
        }
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebError::Flash { to, message } => write!(f, "redirect to {to}: {message}"),
            WebError::BadRequest(msg) | WebError::NotFound(msg) => {
                write!(f, "{}: {msg}", self.status_code())
            }
            WebError::Internal => write!(f, "{}", self.status_code()),
        }
    }
}

impl std::error::Error for WebError {}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            WebError::Flash { to, message } => {
                redirect_with_flash(CookieJar::new(), &to, &message).into_response()
            }
            WebError::BadRequest(msg) | WebError::NotFound(msg) => error_page(status, &msg),
            WebError::Internal => {
                error_page(status, "Something went wrong. Please try again later.")
            }
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let title = status.canonical_reason().unwrap_or("Error");
    let mut context = TemplateContext::new();
    context.set("message", message);

    match PageRenderer::new().and_then(|pages| pages.render("error", title, &context)) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {}", e);
            (status, message.to_string()).into_response()
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{LOCATION, SET_COOKIE};

    #[test]
    fn test_from_reader_error() {
        let err = WebError::from(ReaderError::NotFound("entry".to_string()));
        assert!(matches!(&err, WebError::NotFound(msg) if msg == "Entry not found"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = WebError::from(ReaderError::Validation("bad".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = WebError::from(ReaderError::Database("locked".to_string()));
        assert!(matches!(err, WebError::Internal));
    }

    #[test]
    fn test_redirect_to_keeps_user_errors_on_page() {
        let err = WebError::redirect_to("/feeds")(ReaderError::Validation(
            "URL scheme must be http or https".to_string(),
        ));
        assert!(matches!(
            &err,
            WebError::Flash { to, message }
                if to == "/feeds" && message == "URL scheme must be http or https"
        ));

        let err = WebError::redirect_to("/feeds")(ReaderError::Feed("HTTP 404".to_string()));
        assert!(matches!(&err, WebError::Flash { message, .. } if message == "Feed error: HTTP 404"));

        let err = WebError::redirect_to("/feeds")(ReaderError::NotFound("feed".to_string()));
        assert!(matches!(err, WebError::NotFound(_)));
    }

    #[test]
    fn test_flash_response() {
        let response = WebError::flash("/register", "Email is required").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/register");
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=Email%20is%20required"));
    }

    #[tokio::test]
    async fn test_not_found_page() {
        let response = WebError::NotFound("Feed not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<title>Not Found - mureader</title>"));
        assert!(html.contains("Feed not found"));
    }

    #[tokio::test]
    async fn test_internal_page_hides_details() {
        let response = WebError::internal("Query failed", "secret detail").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(!html.contains("secret detail"));
    }
}

//! Page handlers for the web frontend.

pub mod auth;
pub mod feed;

pub use auth::*;
pub use feed::*;

use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{encode, EncodingKey, Header};

use super::error::WebError;
use super::flash::take_flash;
use super::middleware::{JwtClaims, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::config::{FeedsConfig, WebConfig};
use crate::db::{RefreshTokenRepository, User};
use crate::feed::{FeedFetcher, FeedService};
use crate::template::{PageRenderer, TemplateContext};
use crate::{Database, Result};

/// Application state shared across handlers.
pub struct AppState {
    pub db: Database,
    /// HTTP client for feed fetches triggered from pages.
    pub fetcher: FeedFetcher,
    pub pages: PageRenderer,
    /// JWT encoding key.
    pub encoding_key: EncodingKey,
    /// Access token expiry in seconds.
    pub access_token_expiry: u64,
    /// Refresh token expiry in days.
    pub refresh_token_expiry: u64,
    /// Mark session cookies `Secure`.
    pub secure_cookies: bool,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, web: &WebConfig, feeds: &FeedsConfig) -> Result<Self> {
        Ok(Self {
            db,
            fetcher: FeedFetcher::new(feeds)?,
            pages: PageRenderer::new()?,
            encoding_key: EncodingKey::from_secret(web.jwt_secret.as_bytes()),
            access_token_expiry: web.jwt_access_token_expiry_secs,
            refresh_token_expiry: web.jwt_refresh_token_expiry_days,
            secure_cookies: web.secure_cookies,
        })
    }

    /// Feed operations bound to this state's database and fetcher.
    pub fn feeds(&self) -> FeedService<'_> {
        FeedService::new(&self.db, &self.fetcher)
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> std::result::Result<String, WebError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| WebError::internal("Failed to encode JWT", e))
    }

    /// Start a session: a fresh access token and a stored refresh token.
    pub async fn start_session(
        &self,
        jar: CookieJar,
        user: &User,
    ) -> std::result::Result<CookieJar, WebError> {
        let access_token = self.generate_access_token(user)?;
        let refresh_token = RefreshTokenRepository::new(self.db.pool())
            .issue(
                user.id,
                chrono::Duration::days(self.refresh_token_expiry as i64),
            )
            .await
            .map_err(|e| WebError::internal("Failed to store refresh token", e))?;

        Ok(jar
            .add(self.session_cookie(ACCESS_COOKIE, access_token))
            .add(self.session_cookie(REFRESH_COOKIE, refresh_token.token)))
    }

    /// Remove both session cookies.
    pub fn end_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
            .remove(Cookie::build(REFRESH_COOKIE).path("/"))
    }

    fn session_cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .build()
    }

    /// Render a page inside the layout.
    ///
    /// Sets `current_user` and consumes the pending flash message.
    pub fn render(
        &self,
        jar: CookieJar,
        page: &str,
        title: &str,
        current_user: Option<&str>,
        mut context: TemplateContext,
    ) -> std::result::Result<Response, WebError> {
        let (jar, flash) = take_flash(jar);
        context.set("current_user", current_user);
        context.set("flash", flash);

        let html = self
            .pages
            .render(page, title, &context)
            .map_err(|e| WebError::internal("Failed to render page", e))?;
        Ok((jar, Html(html)).into_response())
    }
}

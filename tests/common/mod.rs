//! Shared helpers for the web integration tests.

#![allow(dead_code)]

use axum_extra::extract::cookie::Cookie;
use axum_test::{TestResponse, TestServer};
use chrono::{TimeZone, Utc};

use mureader::config::{FeedsConfig, WebConfig};
use mureader::feed::{FeedRepository, ParsedEntry, ParsedFeed};
use mureader::web::middleware::{ACCESS_COOKIE, REFRESH_COOKIE};
use mureader::web::WebServer;
use mureader::{Database, FeedFetcher, FeedService};

pub const JWT_SECRET: &str = "integration-test-secret";
pub const EMAIL: &str = "reader@example.com";
pub const PASSWORD: &str = "correct horse battery";
pub const FEED_URL: &str = "https://blog.example.com/feed.xml";

pub fn web_config() -> WebConfig {
    WebConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt_secret: JWT_SECRET.to_string(),
        ..Default::default()
    }
}

pub fn feeds_config() -> FeedsConfig {
    FeedsConfig {
        update_enabled: false,
        ..Default::default()
    }
}

/// Test application with its database.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let web = WebServer::new(&web_config(), &feeds_config(), db.clone()).unwrap();
        let server = TestServer::new(web.router()).unwrap();
        Self { server, db }
    }

    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/register")
            .form(&[("email", email), ("password", password)])
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/login")
            .form(&[("email", email), ("password", password)])
            .await
    }

    /// Register and log in the default user.
    pub async fn session(&self) -> Session {
        self.session_for(EMAIL).await
    }

    pub async fn session_for(&self, email: &str) -> Session {
        let response = self.register(email, PASSWORD).await;
        assert_location(&response, "/login");

        let response = self.login(email, PASSWORD).await;
        assert_location(&response, "/");
        Session::from_response(&response)
    }

    /// Store a parsed feed as if it had just been fetched.
    pub async fn ingest_example_feed(&self) -> i64 {
        let fetcher = FeedFetcher::new(&feeds_config()).unwrap();
        let feed = FeedRepository::new(self.db.pool())
            .find_or_create(FEED_URL)
            .await
            .unwrap();
        let id = feed.id;
        FeedService::new(&self.db, &fetcher)
            .ingest(feed, &example_feed())
            .await
            .unwrap();
        id
    }

    /// Entry IDs of the newest entries, newest first.
    pub async fn entry_ids(&self) -> Vec<i64> {
        let fetcher = FeedFetcher::new(&feeds_config()).unwrap();
        FeedService::new(&self.db, &fetcher)
            .latest(None)
            .await
            .unwrap()
            .iter()
            .map(|listing| listing.entry.id)
            .collect()
    }
}

/// Cookies of a logged in browser.
pub struct Session {
    pub access: Cookie<'static>,
    pub refresh: Cookie<'static>,
}

impl Session {
    pub fn from_response(response: &TestResponse) -> Self {
        Self {
            access: response.cookie(ACCESS_COOKIE),
            refresh: response.cookie(REFRESH_COOKIE),
        }
    }
}

pub fn example_feed() -> ParsedFeed {
    let post = |n: u32| {
        ParsedEntry::new(format!("https://blog.example.com/posts/{n}"))
            .with_title(format!("Post <{n}>"))
            .with_content(format!("<p>Body {n}</p>"))
            .with_updated_at(Utc.with_ymd_and_hms(2024, 3, 1, n, 0, 0).unwrap())
    };

    ParsedFeed {
        title: Some("Example Blog".to_string()),
        updated_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        homepage_url: Some("https://blog.example.com/".to_string()),
        entries: vec![post(1), post(2), post(3)],
    }
}

#[track_caller]
pub fn assert_location(response: &TestResponse, expected: &str) {
    response.assert_status(axum::http::StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), expected);
}

/// Decoded flash message set by a response, if any.
pub fn flash(response: &TestResponse) -> Option<String> {
    response.maybe_cookie("flash").map(|cookie| {
        urlencoding::decode(cookie.value())
            .unwrap()
            .into_owned()
    })
}

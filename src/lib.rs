//! mureader - a small personal feed reader
//!
//! Users register, subscribe to RSS/Atom/JSON feeds and read or like the
//! entries through server-rendered pages.

pub mod auth;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod template;
pub mod web;

pub use auth::{
    hash_password, validate_password, verify_password, PasswordError, TotpError,
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{ReaderError, Result};
pub use feed::{FeedFetcher, FeedService, FeedUpdater};
pub use web::WebServer;

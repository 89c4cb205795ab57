//! Configuration module for mureader.

use serde::Deserialize;
use std::path::Path;

use crate::{ReaderError, Result};

/// Environment variable overriding the JWT secret.
pub const ENV_SECRET_KEY: &str = "MUREADER_SECRET_KEY";

/// Environment variable overriding the database path.
pub const ENV_DATABASE: &str = "MUREADER_DATABASE";

/// Web server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (must be set to serve).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Mark session cookies as `Secure` (HTTPS only).
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    5000
}

fn default_jwt_access_expiry() -> u64 {
    86400 // 1 day
}

fn default_jwt_refresh_expiry() -> u64 {
    30
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            secure_cookies: false,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/mureader.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mureader.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Feed fetching and update configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Whether the background updater runs while serving.
    #[serde(default = "default_update_enabled")]
    pub update_enabled: bool,
    /// Interval between background refreshes in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Maximum stored content length in characters.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_update_enabled() -> bool {
    true
}

fn default_update_interval() -> u64 {
    1800 // 30 minutes
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_content_length() -> usize {
    10000
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            update_enabled: default_update_enabled(),
            update_interval_secs: default_update_interval(),
            max_feed_size_bytes: default_max_feed_size(),
            max_content_length: default_max_content_length(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web server configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed configuration.
    #[serde(default)]
    pub feeds: FeedsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ReaderError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ReaderError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(ENV_SECRET_KEY) {
            if !secret.is_empty() {
                self.web.jwt_secret = secret;
            }
        }
        if let Ok(path) = std::env::var(ENV_DATABASE) {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration for serving.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(ReaderError::Config(format!(
                "jwt_secret is not set. Set it in config.toml or via the {ENV_SECRET_KEY} environment variable."
            )));
        }
        if self.feeds.update_enabled && self.feeds.update_interval_secs == 0 {
            return Err(ReaderError::Config(
                "feeds.update_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.web.port, 5000);
        assert!(config.web.cors_origins.is_empty());
        assert!(config.web.jwt_secret.is_empty());
        assert_eq!(config.web.jwt_access_token_expiry_secs, 86400);
        assert_eq!(config.web.jwt_refresh_token_expiry_days, 30);
        assert!(!config.web.secure_cookies);

        assert_eq!(config.database.path, "data/mureader.db");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/mureader.log");

        assert!(config.feeds.update_enabled);
        assert_eq!(config.feeds.update_interval_secs, 1800);
        assert_eq!(config.feeds.max_feed_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.feeds.max_content_length, 10000);
        assert_eq!(config.feeds.max_redirects, 5);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[web]
host = "0.0.0.0"
port = 8080
cors_origins = ["https://reader.example.com"]
jwt_secret = "s3cret"
jwt_access_token_expiry_secs = 600
secure_cookies = true

[database]
path = "custom/reader.sqlite"

[logging]
level = "debug"
file = "custom/reader.log"

[feeds]
update_enabled = false
update_interval_secs = 60
max_content_length = 500
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.web.cors_origins, vec!["https://reader.example.com"]);
        assert_eq!(config.web.jwt_secret, "s3cret");
        assert_eq!(config.web.jwt_access_token_expiry_secs, 600);
        assert_eq!(config.web.jwt_refresh_token_expiry_days, 30);
        assert!(config.web.secure_cookies);
        assert_eq!(config.database.path, "custom/reader.sqlite");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.feeds.update_enabled);
        assert_eq!(config.feeds.update_interval_secs, 60);
        assert_eq!(config.feeds.max_content_length, 500);
        assert_eq!(config.feeds.connect_timeout_secs, 10);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.web.port, 5000);
        assert_eq!(config.database.path, "data/mureader.db");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[web\nport = ");
        assert!(matches!(result, Err(ReaderError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ReaderError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[web]\nport = 9000\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.web.port, 9000);
    }

    #[test]
    fn test_env_overrides() {
        let original_secret = std::env::var(ENV_SECRET_KEY).ok();
        let original_db = std::env::var(ENV_DATABASE).ok();

        std::env::set_var(ENV_SECRET_KEY, "env-secret-key");
        std::env::set_var(ENV_DATABASE, "");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.web.jwt_secret, "env-secret-key");
        // Empty values are ignored
        assert_eq!(config.database.path, "data/mureader.db");

        match original_secret {
            Some(val) => std::env::set_var(ENV_SECRET_KEY, val),
            None => std::env::remove_var(ENV_SECRET_KEY),
        }
        match original_db {
            Some(val) => std::env::set_var(ENV_DATABASE, val),
            None => std::env::remove_var(ENV_DATABASE),
        }
    }

    #[test]
    fn test_validate_requires_secret() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.web.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());

        config.feeds.update_interval_secs = 0;
        assert!(config.validate().is_err());

        config.feeds.update_enabled = false;
        assert!(config.validate().is_ok());
    }
}

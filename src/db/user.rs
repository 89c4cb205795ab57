//! User model for mureader.

use chrono::{DateTime, Utc};

use crate::auth::totp;
use crate::datetime::parse_datetime;

/// User entity representing a registered reader.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login email (unique, case-insensitive).
    pub email: String,
    /// Whether the email address has been confirmed.
    pub email_confirmed: bool,
    /// Public handle (optional, unique).
    pub username: Option<String>,
    /// Whether the profile is publicly visible.
    pub public_profile: bool,
    /// Base32 TOTP secret.
    pub otp_secret: Option<String>,
    /// Password hash (Argon2). Absent for accounts without a password.
    pub password: Option<String>,
    /// Registration timestamp.
    pub registered_on: DateTime<Utc>,
    /// Whether the user has a pro account.
    pub is_pro: bool,
}

impl User {
    /// Name shown in pages: the username if set, otherwise the email.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }

    /// Check a password against the stored hash.
    ///
    /// Accounts without a password never match.
    pub fn verify_password(&self, password: &str) -> bool {
        match &self.password {
            Some(hash) => crate::auth::verify_password(password, hash).is_ok(),
            None => false,
        }
    }
}

/// Row type for users from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct UserRow {
    id: i64,
    email: String,
    email_confirmed: bool,
    username: Option<String>,
    public_profile: bool,
    otp_secret: Option<String>,
    password: Option<String>,
    registered_on: String,
    is_pro: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            email_confirmed: row.email_confirmed,
            username: row.username,
            public_profile: row.public_profile,
            otp_secret: row.otp_secret,
            password: row.password,
            registered_on: parse_datetime(&row.registered_on).unwrap_or_else(Utc::now),
            is_pro: row.is_pro,
        }
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Password hash (already hashed).
    pub password: Option<String>,
    /// Base32 TOTP secret.
    pub otp_secret: String,
}

impl NewUser {
    /// Create a new user with a freshly generated TOTP secret.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: None,
            otp_secret: totp::generate_secret(),
        }
    }

    /// Set the password hash.
    pub fn with_password(mut self, password_hash: impl Into<String>) -> Self {
        self.password = Some(password_hash.into());
        self
    }
}

//! Authentication helpers for mureader.
//!
//! Password hashing and TOTP secrets. Session tokens live in the web layer.

mod password;
pub mod totp;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use totp::TotpError;

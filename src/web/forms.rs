//! Form bodies posted by the pages.
//!
//! Missing fields deserialize as empty strings so that the handlers can
//! answer with the same flash message as for blank input. Emails and URLs
//! are trimmed while deserializing, so whitespace counts as blank.

use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidationErrors};

/// Registration form.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl RegisterForm {
    /// Fields in the order their errors are reported.
    pub const FIELDS: &'static [&'static str] = &["email", "password"];
}

/// Login form.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default, deserialize_with = "trimmed")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Subscription form on the feeds page.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SubscribeForm {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Feed URL is required"))]
    pub url: String,
}

impl SubscribeForm {
    pub const FIELDS: &'static [&'static str] = &["url"];
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

/// Validate a form and return the message of the first failing field.
///
/// `fields` fixes the reporting order.
pub fn first_error<T: Validate>(form: &T, fields: &[&str]) -> Option<String> {
    form.validate()
        .err()
        .and_then(|errors| first_message(&errors, fields))
}

fn first_message(errors: &ValidationErrors, fields: &[&str]) -> Option<String> {
    let field_errors = errors.field_errors();
    fields.iter().find_map(|field| {
        field_errors.get(field).and_then(|errs| {
            errs.iter().next().map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {field}"))
            })
        })
    })
}

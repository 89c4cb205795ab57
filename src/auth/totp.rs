//! RFC 6238 one-time passwords.
//!
//! Every account gets a base32 secret at registration; the index page shows
//! the provisioning URI so the secret can be loaded into an authenticator.

use thiserror::Error;
use totp_rs::{Rfc6238, Secret, TOTP};

/// Issuer shown by authenticator apps.
pub const ISSUER: &str = "mureader";

/// TOTP-related errors.
#[derive(Error, Debug)]
pub enum TotpError {
    /// The stored secret is not valid base32 or is too short.
    #[error("invalid TOTP secret")]
    InvalidSecret,

    /// The generator could not be built from the secret.
    #[error("failed to initialize TOTP: {0}")]
    Initialize(String),
}

/// Generate a new random base32 secret.
pub fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

fn build(secret: &str, account_name: &str) -> Result<TOTP, TotpError> {
    let bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|_| TotpError::InvalidSecret)?;
    let mut rfc = Rfc6238::with_defaults(bytes).map_err(|e| TotpError::Initialize(e.to_string()))?;
    rfc.issuer(ISSUER.to_string());
    rfc.account_name(account_name.to_string());
    TOTP::from_rfc6238(rfc).map_err(|e| TotpError::Initialize(e.to_string()))
}

/// Build the `otpauth://` provisioning URI for an account.
pub fn provisioning_uri(secret: &str, email: &str) -> Result<String, TotpError> {
    Ok(build(secret, email)?.get_url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_is_base32() {
        let secret = generate_secret();
        assert!(!secret.is_empty());
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
        assert_ne!(secret, generate_secret());
    }

    #[test]
    fn test_provisioning_uri() {
        let secret = generate_secret();
        let uri = provisioning_uri(&secret, "reader@example.com").unwrap();
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains(&format!("secret={secret}")));
        assert!(uri.contains("issuer=mureader"));
    }

    #[test]
    fn test_invalid_secret() {
        let result = provisioning_uri("not base32!", "reader@example.com");
        assert!(matches!(result, Err(TotpError::InvalidSecret)));
    }
}

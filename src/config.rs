//! Per-account connection configuration

use crate::error::ConfigError;
use std::env;

/// How the transport should be encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// TLS handshake immediately after the TCP dial (usually port 993).
    Implicit,
    /// Dial plaintext, then upgrade via STARTTLS if the server offers
    /// it. If the server refuses the upgrade the session continues in
    /// plaintext with a logged warning -- use [`Security::Implicit`]
    /// when encryption must be guaranteed.
    #[default]
    Opportunistic,
}

/// Connection settings for one IMAP account.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub security: Security,
}

impl AccountConfig {
    /// Load account configuration from environment variables.
    ///
    /// Reads from `.env` if present. Required variables:
    /// - `IMAP_USERNAME`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_HOST` (default: `127.0.0.1`)
    /// - `IMAP_PORT` (default: `143`)
    /// - `IMAP_SECURITY` (`starttls` or `implicit`, default: `starttls`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let security = match env::var("IMAP_SECURITY")
            .unwrap_or_else(|_| "starttls".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "implicit" => Security::Implicit,
            "starttls" => Security::Opportunistic,
            other => {
                return Err(ConfigError(format!("invalid IMAP_SECURITY: {other:?}")));
            }
        };

        Ok(Self {
            host: env::var("IMAP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("IMAP_PORT")
                .unwrap_or_else(|_| "143".to_string())
                .parse()
                .map_err(|e| ConfigError(format!("invalid IMAP_PORT: {e}")))?,
            username: env::var("IMAP_USERNAME")
                .map_err(|_| ConfigError("IMAP_USERNAME not set".into()))?,
            password: env::var("IMAP_PASSWORD")
                .map_err(|_| ConfigError("IMAP_PASSWORD not set".into()))?,
            security,
        })
    }
}

//! Typed configuration from environment variables and an optional TOML file.
//!
//! Backend settings load once at startup and fail fast if required vars are
//! missing. The scheduler token is wrapped in secrecy::SecretString so it
//! never reaches logs. Session tuning lives in [`SessionConfig`].

pub mod session;

use std::time::Duration;

use crate::error::{Error, Result};

pub use secrecy::{ExposeSecret, SecretString};
pub use session::SessionConfig;

#[derive(Debug)]
pub struct Config {
    pub scheduler_url: String,
    pub scheduler_token: Option<SecretString>,
    pub request_timeout: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                Error::Config(format!("REQUEST_TIMEOUT_SECS must be a whole number, got {raw:?}"))
            })?),
            Err(_) => Duration::from_secs(10),
        };

        Ok(Self {
            scheduler_url: required_var("SCHEDULER_URL")?,
            scheduler_token: std::env::var("SCHEDULER_TOKEN").ok().map(SecretString::from),
            request_timeout,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

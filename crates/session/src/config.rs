//! Session configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `RENTAL_DESK_STORAGE_DIR` - Directory for the durable scope (default: .rental-desk)
//! - `RENTAL_DESK_VERIFY_ON_HYDRATE` - Check a restored session with the identity service (default: false)
//! - `RENTAL_DESK_MOCK_LATENCY_MS` - Artificial delay for mock identity calls (default: 0)
//! - `RENTAL_DESK_LOGIN_PATH` - Login route used by gates (default: /login)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::policy::{AuthorizationPolicy, LOGIN_PATH};

const DEFAULT_STORAGE_DIR: &str = ".rental-desk";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Session controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory backing the durable storage scope
    pub storage_dir: PathBuf,
    /// Verify hydrated sessions against the identity service
    pub verify_on_hydrate: bool,
    /// Delay added to every mock identity call
    pub mock_latency: Duration,
    /// Login route for unauthenticated redirects
    pub login_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            verify_on_hydrate: false,
            mock_latency: Duration::ZERO,
            login_path: LOGIN_PATH.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let storage_dir = PathBuf::from(get_env_or_default(
            "RENTAL_DESK_STORAGE_DIR",
            DEFAULT_STORAGE_DIR,
        ));
        let verify_on_hydrate = parse_bool(
            "RENTAL_DESK_VERIFY_ON_HYDRATE",
            &get_env_or_default("RENTAL_DESK_VERIFY_ON_HYDRATE", "false"),
        )?;
        let latency_ms = get_env_or_default("RENTAL_DESK_MOCK_LATENCY_MS", "0")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("RENTAL_DESK_MOCK_LATENCY_MS".to_string(), e.to_string())
            })?;

        let login_path = get_env_or_default("RENTAL_DESK_LOGIN_PATH", LOGIN_PATH);
        if !login_path.starts_with('/') {
            return Err(ConfigError::InvalidEnvVar(
                "RENTAL_DESK_LOGIN_PATH".to_string(),
                "must start with '/'".to_string(),
            ));
        }

        Ok(Self {
            storage_dir,
            verify_on_hydrate,
            mock_latency: Duration::from_millis(latency_ms),
            login_path,
        })
    }

    /// Authorization policy using the configured login route.
    #[must_use]
    pub fn policy(&self) -> AuthorizationPolicy {
        AuthorizationPolicy::with_login_path(self.login_path.clone())
    }
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected true or false, got '{other}'"),
        )),
    }
}

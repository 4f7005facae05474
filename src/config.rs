//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup. A `.env` file is honoured for local development.

use std::env;

use crate::services::proximity::DEFAULT_TOLERANCE_METERS;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend (REST, storage and functions)
    pub backend_url: String,
    /// Public API key sent with every backend request
    pub api_key: String,
    /// Session access token for the signed-in user, if any
    pub access_token: Option<String>,
    /// Storage bucket for uploaded proof photos
    pub storage_bucket: String,
    /// Name of the function that judges photos
    pub judge_function: String,
    /// Radius within which a location proof passes
    pub proximity_tolerance_meters: f64,
    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            api_key: "test_anon_key".to_string(),
            access_token: None,
            storage_bucket: "quest-upload".to_string(),
            judge_function: "replicate-call".to_string(),
            proximity_tolerance_meters: DEFAULT_TOLERANCE_METERS,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            backend_url: env::var("QUEST_BACKEND_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("QUEST_BACKEND_URL"))?,
            api_key: env::var("QUEST_BACKEND_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("QUEST_BACKEND_ANON_KEY"))?,
            access_token: env::var("QUEST_ACCESS_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            storage_bucket: env::var("QUEST_STORAGE_BUCKET")
                .unwrap_or_else(|_| "quest-upload".to_string()),
            judge_function: env::var("QUEST_JUDGE_FUNCTION")
                .unwrap_or_else(|_| "replicate-call".to_string()),
            proximity_tolerance_meters: parse_or(
                "QUEST_PROXIMITY_TOLERANCE_M",
                DEFAULT_TOLERANCE_METERS,
            )?,
            http_timeout_secs: parse_or("QUEST_HTTP_TIMEOUT_SECS", 30)?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

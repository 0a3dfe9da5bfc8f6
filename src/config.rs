//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use chrono_tz::Tz;

/// Which store backs the activity collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store; state is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    pub store_backend: StoreBackend,
    /// Zone in which daytime bounds (08:00-18:00) are evaluated
    pub schedule_timezone: Tz,
    /// Conditional writes attempted per append before giving up
    pub mutation_max_attempts: u32,
    /// First retry back-off (milliseconds)
    pub mutation_retry_base_ms: u64,
    /// Wall-clock limit per append (milliseconds), None to disable
    pub mutation_deadline_ms: Option<u64>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            store_backend: StoreBackend::Memory,
            schedule_timezone: Tz::UTC,
            mutation_max_attempts: 8,
            mutation_retry_base_ms: 10,
            mutation_deadline_ms: Some(2000),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mutation_deadline_ms = match parse_var::<u64>("MUTATION_DEADLINE_MS", 2000)? {
            0 => None,
            ms => Some(ms),
        };

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            schedule_timezone: env::var("SCHEDULE_TIMEZONE")
                .unwrap_or_else(|_| "UTC".to_string())
                .parse::<Tz>()
                .map_err(|e| ConfigError::Invalid("SCHEDULE_TIMEZONE", e.to_string()))?,
            mutation_max_attempts: parse_var("MUTATION_MAX_ATTEMPTS", 8)?,
            mutation_retry_base_ms: parse_var("MUTATION_RETRY_BASE_MS", 10)?,
            mutation_deadline_ms,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

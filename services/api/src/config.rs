//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the external employer API.
#[derive(Clone, Debug)]
pub struct EmployerApiConfig {
    /// When false, the built-in sample job source is used instead.
    pub enabled: bool,
    pub base_url: String,
    /// Provisioned but not sent; neither endpoint requires it.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub job_cache_ttl: Duration,
    pub employer_api: EmployerApiConfig,
}

fn parse_secs(name: &str, default: u64) -> Result<Duration, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn parse_flag(name: &str) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("'{}' is not a boolean", other),
            )),
        },
        Err(_) => Ok(false),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Job Sync Settings ---
        let job_cache_ttl = parse_secs("JOB_CACHE_TIMEOUT", 900)?;

        // --- Employer API Settings ---
        let enabled = parse_flag("EMPLOYER_API_ENABLED")?;
        let base_url = std::env::var("EMPLOYER_API_BASE_URL")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();
        if enabled && base_url.is_empty() {
            return Err(ConfigError::MissingVar("EMPLOYER_API_BASE_URL".to_string()));
        }
        let api_key = std::env::var("EMPLOYER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        let timeout = parse_secs("EMPLOYER_API_TIMEOUT", 10)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            job_cache_ttl,
            employer_api: EmployerApiConfig {
                enabled,
                base_url,
                api_key,
                timeout,
            },
        })
    }
}

//! services/api/src/error.rs
//!
//! Errors that stop the job portal service from starting or serving.
//! Request-level failures are mapped to HTTP responses in `web::rest` instead.

use crate::config::ConfigError;
use job_portal_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Opening the SQLite pool failed.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The employer API client could not be built.
    #[error("Employer API client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Binding or serving the listener failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Poll interval must be greater than zero")]
    InvalidPollInterval,

    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Batch size exceeds maximum allowed (1000)")]
    BatchSizeTooLarge,

    #[error("Invalid log filter directive: {0}")]
    InvalidLogFilter(String),

    #[error("Production requires JSON log format")]
    ProductionRequiresJsonLogs,
}

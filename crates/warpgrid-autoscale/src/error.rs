//! Autoscaler error types.

use thiserror::Error;

/// Errors from loading or validating autoscaler configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors from the autoscaler worker pool.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool capacity must be at least 1")]
    InvalidCapacity,

    #[error("worker pool has been released")]
    Released,
}

/// Errors that can occur while constructing or driving the autoscaler.
#[derive(Debug, Error)]
pub enum AutoscaleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}

pub type AutoscaleResult<T> = Result<T, AutoscaleError>;

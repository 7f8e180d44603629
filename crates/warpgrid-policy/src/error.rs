//! Error types for policy backends.

use thiserror::Error;

/// Result type alias for policy backend operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Errors that can occur during policy backend operations.
///
/// The in-memory backend never produces these; durable backends bound
/// through the same contract do.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy backend unavailable: {0}")]
    Unavailable(String),

    #[error("invalid duration {0:?}: expected e.g. \"500ms\", \"30s\", \"5m\", \"1h\"")]
    InvalidDuration(String),
}

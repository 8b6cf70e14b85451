//! Common error types for mediastem

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Common result type for mediastem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the service
///
/// Provider-level failures are recovered internally by falling through
/// to the next provider; only `AllProvidersFailed` reaches the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Request quota exhausted for this client; wait until `reset_at`
    #[error("Rate limit reached ({total} per window); retry after {reset_at}")]
    RateLimited {
        remaining: u32,
        total: u32,
        reset_at: DateTime<Utc>,
    },

    /// Every provider in the fallback chain failed; message carries
    /// each provider's individual reason
    #[error("All providers failed: {0}")]
    AllProvidersFailed(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

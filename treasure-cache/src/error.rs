//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// I/O error from a persistent backend
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Key not found (or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored value is not an integer, so it cannot be adjusted
    #[error("Value for key {0} is not numeric")]
    NotNumeric(String),

    /// Adjustment would leave the range of a signed 64-bit counter
    #[error("Counter overflow for key {0}")]
    Overflow(String),

    /// Exclusive lock could not be obtained
    #[error("Lock error: {0}")]
    Lock(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Cache error: {0}")]
    Other(String),
}

impl CacheError {
    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Other(format!("Task join error: {}", err))
    }
}

//! Error types for namespaced cache operations.

use thiserror::Error;
use treasure_cache::CacheError;

/// Result type for namespaced cache operations.
pub type ChestResult<T> = Result<T, ChestError>;

/// Errors raised by the key mapper and the namespaced cache facade.
#[derive(Debug, Error)]
pub enum ChestError {
    /// Invalid configuration, such as a delimiter that is not one character
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation name outside the recognized set
    #[error("Unknown cache operation: {0}")]
    UnknownOperation(String),

    /// Operation invoked without an argument it needs
    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments {
        /// Operation name.
        operation: &'static str,
        /// Missing or malformed argument.
        reason: String,
    },

    /// A namespace version counter could not be read or seeded
    #[error("Cannot resolve version of namespace {namespace}: {reason}")]
    VersionResolution {
        /// Namespace path being resolved.
        namespace: String,
        /// What went wrong.
        reason: String,
    },

    /// The cache backend reported a failure
    #[error(transparent)]
    Backend(#[from] CacheError),
}

impl ChestError {
    /// Check if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is an unknown operation error.
    pub fn is_unknown_operation(&self) -> bool {
        matches!(self, Self::UnknownOperation(_))
    }

    /// Check if the backend reported the key as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Backend(err) if err.is_not_found())
    }
}

//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Data-path operations
//! (`set`, `get`, `remove`) never fail; errors only surface while building a
//! cache or converting raw eviction-reason codes.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache was built outside of a Tokio runtime
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    /// Configuration values cannot be used as given
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A raw eviction-reason code outside the known set
    #[error("Unknown eviction reason code: {0}")]
    UnknownReason(u8),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

//! Error types for cache operations.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend is unreachable or refused the request.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The key exceeds the backend's key length limit.
    #[error("cache key too long: {len} bytes (max {max})")]
    KeyTooLong { len: usize, max: usize },

    /// The value exceeds the backend's item size limit.
    #[error("cache value too large: {len} bytes (max {max})")]
    ValueTooLarge { len: usize, max: usize },
}

/// Convenience type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

//! Redis error types.

use thiserror::Error;

/// Result type for cache and channel operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from the cache store or pub/sub channels.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

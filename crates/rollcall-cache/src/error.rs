//! Cache errors

use thiserror::Error;

/// Ephemeral store errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Redis command or connection error
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored value has an unexpected type for the requested operation
    #[error("wrong value type for key {0}")]
    WrongType(String),
}

/// Result alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

use thiserror::Error;

/// Errors surfaced by cache tiers.
///
/// Remote-tier infrastructure failures are handled inside [`crate::RedisCache`]
/// and degrade to misses; this type mostly travels on the `put` path, where a
/// local-tier failure is fatal to the call.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("cache operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

use std::io;

/// An error raised by a cache store or by the cache's encoding pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The payload could not be (de)compressed.
    #[error("Compression failed: {0}")]
    Compression(#[from] snap::Error),
    /// The entry could not be (de)serialized.
    #[error("Could not encode cache entry: {0}")]
    Encoding(#[from] serde_json::Error),
    #[cfg(feature = "redis")]
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[cfg(feature = "memcache")]
    #[error(transparent)]
    Memcache(#[from] memcache::MemcacheError),
    /// A blocking store operation could not be completed.
    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    /// The name of a store or compressor is not known.
    #[error("Unknown {kind} '{name}'")]
    UnknownStrategy {
        /// What was looked up, e.g. `"compressor"`.
        kind: &'static str,
        /// The name that was given.
        name: String,
    },
    /// The key cannot be stored by this backend.
    #[error("Invalid cache key '{0}'")]
    InvalidKey(String),
}

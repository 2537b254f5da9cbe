//! Storage backends of the cache.

mod file;
#[cfg(feature = "memcache")]
mod memcache;
mod memory;
mod null;
#[cfg(feature = "redis")]
mod redis;

use crate::CacheError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

pub use file::FileStore;
#[cfg(feature = "memcache")]
pub use memcache::MemcacheStore;
pub use memory::MemoryStore;
pub use null::NullStore;
#[cfg(feature = "redis")]
pub use redis::RedisStore;

/// A key/value store holding opaque, already encoded cache payloads.
#[async_trait]
pub trait CacheStore: Debug + Send + Sync {
    /// Returns the payload stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` under `key`, replacing any previous payload.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Removes all payloads.
    async fn purge(&self) -> Result<(), CacheError>;
}

/// The names under which the stores can be selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheStoreKind {
    #[default]
    Null,
    Memory,
    File,
    #[cfg(feature = "redis")]
    Redis,
    #[cfg(feature = "memcache")]
    Memcache,
}

impl FromStr for CacheStoreKind {
    type Err = CacheError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "null" => Ok(Self::Null),
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            #[cfg(feature = "redis")]
            "redis" => Ok(Self::Redis),
            #[cfg(feature = "memcache")]
            "memcached" | "memcache" => Ok(Self::Memcache),
            _ => Err(CacheError::UnknownStrategy {
                kind: "cache store",
                name: name.to_owned(),
            }),
        }
    }
}

/// The settings needed to open a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStoreConfig {
    Null,
    Memory {
        max_entries: usize,
    },
    File {
        root: PathBuf,
    },
    #[cfg(feature = "redis")]
    Redis {
        url: String,
    },
    #[cfg(feature = "memcache")]
    Memcache {
        servers: Vec<String>,
    },
}

impl CacheStoreConfig {
    pub fn kind(&self) -> CacheStoreKind {
        match self {
            Self::Null => CacheStoreKind::Null,
            Self::Memory { .. } => CacheStoreKind::Memory,
            Self::File { .. } => CacheStoreKind::File,
            #[cfg(feature = "redis")]
            Self::Redis { .. } => CacheStoreKind::Redis,
            #[cfg(feature = "memcache")]
            Self::Memcache { .. } => CacheStoreKind::Memcache,
        }
    }

    /// Creates the configured store. Network stores connect eagerly so that misconfiguration is
    /// reported at startup.
    pub async fn open(self) -> Result<Arc<dyn CacheStore>, CacheError> {
        Ok(match self {
            Self::Null => Arc::new(NullStore),
            Self::Memory { max_entries } => Arc::new(MemoryStore::new(max_entries)),
            Self::File { root } => Arc::new(FileStore::new(root)),
            #[cfg(feature = "redis")]
            Self::Redis { url } => Arc::new(RedisStore::connect(&url).await?),
            #[cfg(feature = "memcache")]
            Self::Memcache { servers } => Arc::new(MemcacheStore::connect(servers).await?),
        })
    }
}

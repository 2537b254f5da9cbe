use crate::{CacheError, CacheStore};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::task::spawn_blocking;

/// A store backed by one or more memcached servers.
///
/// The memcache client is synchronous, so every operation runs on the blocking thread pool.
#[derive(Clone)]
pub struct MemcacheStore {
    servers: Vec<String>,
    client: Arc<memcache::Client>,
}

impl MemcacheStore {
    /// Connects to `servers`, given either as `host:port` or as `memcache://` URLs.
    pub async fn connect(servers: Vec<String>) -> Result<Self, CacheError> {
        let urls = servers
            .iter()
            .map(|server| {
                if server.starts_with("memcache://") {
                    server.clone()
                } else {
                    format!("memcache://{server}")
                }
            })
            .collect::<Vec<_>>();
        let client = spawn_blocking(move || memcache::Client::connect(urls)).await??;
        Ok(Self {
            servers,
            client: Arc::new(client),
        })
    }
}

impl fmt::Debug for MemcacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemcacheStore")
            .field("servers", &self.servers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for MemcacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let client = Arc::clone(&self.client);
        let key = key.to_owned();
        Ok(spawn_blocking(move || client.get::<Vec<u8>>(&key)).await??)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let client = Arc::clone(&self.client);
        let key = key.to_owned();
        Ok(spawn_blocking(move || client.set(&key, value.as_slice(), 0)).await??)
    }

    async fn purge(&self) -> Result<(), CacheError> {
        let client = Arc::clone(&self.client);
        Ok(spawn_blocking(move || client.flush()).await??)
    }
}

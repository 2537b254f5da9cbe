use crate::{cache_key, CacheEntry, CacheError, CacheStore, Compressor};
use std::sync::Arc;
use tracing::{debug, warn};

/// The result cache of the proxy.
///
/// Entries are serialized as JSON and passed through the compressor before they reach the
/// store. The cache is advisory: [`Cache::get`] reports every failure as a miss and
/// [`Cache::put`] only logs failures.
#[derive(Clone, Debug)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    compressor: Compressor,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>, compressor: Compressor) -> Self {
        Self { store, compressor }
    }

    pub fn compressor(&self) -> Compressor {
        self.compressor
    }

    /// The key under which the result of `canonical_query` in the representation `accept` is
    /// stored.
    pub fn key(&self, canonical_query: &str, accept: &str) -> String {
        cache_key(canonical_query, accept, self.compressor)
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(error) => {
                warn!(key, %error, "Cache read failed");
                return None;
            }
        };

        match self.decode(bytes) {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(key, %error, "Discarding undecodable cache entry");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, entry: &CacheEntry) {
        let bytes = match self.encode(entry) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(key, %error, "Could not encode cache entry");
                return;
            }
        };

        let size = bytes.len();
        match self.store.put(key, bytes).await {
            Ok(()) => debug!(key, size, "Stored cache entry"),
            Err(error) => warn!(key, %error, "Cache write failed"),
        }
    }

    /// Removes all entries. Unlike reads and writes, failures are reported to the caller.
    pub async fn purge(&self) -> Result<(), CacheError> {
        self.store.purge().await
    }

    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>, CacheError> {
        self.compressor.compress(serde_json::to_vec(entry)?)
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<CacheEntry, CacheError> {
        Ok(serde_json::from_slice(&self.compressor.decompress(bytes)?)?)
    }
}

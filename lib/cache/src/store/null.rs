use crate::{CacheError, CacheStore};
use async_trait::async_trait;

/// A store that never holds anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: Vec<u8>) -> Result<(), CacheError> {
        Ok(())
    }

    async fn purge(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

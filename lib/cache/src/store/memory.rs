use crate::{CacheError, CacheStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// An in-process store holding at most `max_entries` payloads.
///
/// When full, the entry that was inserted first is evicted. Overwriting a key does not refresh
/// its position.
#[derive(Debug)]
pub struct MemoryStore {
    max_entries: usize,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: HashMap<String, Vec<u8>>,
    insertion_order: VecDeque<String>,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.state.lock().await.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        if self.max_entries == 0 {
            return Ok(());
        }

        let mut state = self.state.lock().await;
        if state.entries.insert(key.to_owned(), value).is_none() {
            state.insertion_order.push_back(key.to_owned());
        }
        while state.entries.len() > self.max_entries {
            let Some(oldest) = state.insertion_order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
        Ok(())
    }

    async fn purge(&self) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.insertion_order.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn evicts_oldest_insertion() {
        let store = MemoryStore::new(2);
        store.put("a", vec![1]).await.unwrap();
        store.put("b", vec![2]).await.unwrap();
        store.put("a", vec![3]).await.unwrap();
        store.put("c", vec![4]).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), Some(vec![2]));
        assert_eq!(store.get("c").await.unwrap(), Some(vec![4]));
    }

    #[tokio::test]
    async fn purge_removes_everything() {
        let store = MemoryStore::new(10);
        store.put("a", vec![1]).await.unwrap();
        store.purge().await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_capacity_stores_nothing() {
        let store = MemoryStore::new(0);
        store.put("a", vec![1]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }
}

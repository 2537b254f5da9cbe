use assert_fs::TempDir;
use sparql_proxy_cache::store::FileStore;
use sparql_proxy_cache::{Cache, CacheEntry, CacheStore, CacheStoreConfig, Compressor};
use std::sync::Arc;

#[tokio::test]
async fn entries_survive_a_new_store_instance() {
    let root = TempDir::new().unwrap();
    let key = "0123abcd.snappy";

    FileStore::new(root.path())
        .put(key, b"payload".to_vec())
        .await
        .unwrap();
    assert!(root.path().join("0/1/0123abcd.snappy").is_file());

    let reopened = FileStore::new(root.path());
    assert_eq!(reopened.get(key).await.unwrap(), Some(b"payload".to_vec()));
}

#[tokio::test]
async fn missing_entries_are_none() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    assert_eq!(store.get("ffff.raw").await.unwrap(), None);
}

#[tokio::test]
async fn overwrite_replaces_payload() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    store.put("abcd.raw", b"first".to_vec()).await.unwrap();
    store.put("abcd.raw", b"second".to_vec()).await.unwrap();
    assert_eq!(store.get("abcd.raw").await.unwrap(), Some(b"second".to_vec()));
}

#[tokio::test]
async fn purge_empties_the_root() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    store.put("abcd.raw", b"x".to_vec()).await.unwrap();
    store.put("efgh.raw", b"y".to_vec()).await.unwrap();

    store.purge().await.unwrap();

    assert_eq!(store.get("abcd.raw").await.unwrap(), None);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn purge_keeps_foreign_files() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("README"), "keep").unwrap();
    std::fs::create_dir(root.path().join("backups")).unwrap();
    std::fs::write(root.path().join("backups/dump.nt"), "keep").unwrap();
    let store = FileStore::new(root.path());
    store.put("abcd.raw", b"x".to_vec()).await.unwrap();

    store.purge().await.unwrap();

    assert_eq!(store.get("abcd.raw").await.unwrap(), None);
    assert!(!root.path().join("a").exists());
    assert!(root.path().join("README").is_file());
    assert!(root.path().join("backups/dump.nt").is_file());
}

#[tokio::test]
async fn purge_of_missing_root_succeeds() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path().join("never-created"));
    store.purge().await.unwrap();
}

#[tokio::test]
async fn cache_over_file_store() {
    let root = TempDir::new().unwrap();
    let store = CacheStoreConfig::File {
        root: root.path().to_path_buf(),
    }
    .open()
    .await
    .unwrap();
    let cache = Cache::new(Arc::clone(&store), Compressor::Snappy);

    let key = cache.key("SELECT * WHERE { ?s ?p ?o }", "text/csv");
    let entry = CacheEntry::new("text/csv", "s,p,o\r\n");
    cache.put(&key, &entry).await;

    assert_eq!(cache.get(&key).await, Some(entry));
    assert!(store.get(&key).await.unwrap().is_some());
}

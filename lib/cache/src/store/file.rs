use crate::{CacheError, CacheStore};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A store keeping one file per entry below `root`.
///
/// Entries are sharded by the first two characters of their key, i.e. `ab12…` lives at
/// `root/a/b/ab12…`. Writes go to a temporary file that is renamed into place, hence readers
/// never observe a partially written entry.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The location of the entry stored under `key`.
    pub fn path_of(&self, key: &str) -> Result<PathBuf, CacheError> {
        let mut chars = key.chars();
        let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
            return Err(CacheError::InvalidKey(key.to_owned()));
        };
        if key.starts_with('.') || key.contains(['/', '\\']) {
            return Err(CacheError::InvalidKey(key.to_owned()));
        }

        Ok(self
            .root
            .join(first.to_string())
            .join(second.to_string())
            .join(key))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path_of(key)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let path = self.path_of(key)?;
        let Some(directory) = path.parent() else {
            return Err(CacheError::InvalidKey(key.to_owned()));
        };
        fs::create_dir_all(directory).await?;

        let temporary = directory.join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&temporary, value).await?;
        if let Err(error) = fs::rename(&temporary, &path).await {
            let _ = fs::remove_file(&temporary).await;
            return Err(error.into());
        }
        Ok(())
    }

    async fn purge(&self) -> Result<(), CacheError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(error.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if is_shard(&entry.file_name()) && entry.file_type().await?.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
            }
        }
        Ok(())
    }
}

/// Whether a directory directly below the root is one the store shards entries into.
fn is_shard(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.chars().count() == 1)
}

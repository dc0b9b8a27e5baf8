//! Directory-backed snapshot store.
//!
//! Each key maps to one file inside the configured directory. Writes go to a
//! temporary sibling first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::SnapshotStore;

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    // Serializes temp-file writes for the same key.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.key_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.dir).await?;
        fs::write(&tmp, &value).await?;
        fs::rename(&tmp, &path).await?;

        tracing::trace!(path = ?path, bytes = value.len(), "Snapshot file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("gateway-store-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn absent_key_before_first_write() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);
        assert!(store.get("snapshot").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);

        store.set("snapshot", b"{\"a\":1}".to_vec()).await.unwrap();
        store.set("snapshot", b"{\"b\":2}".to_vec()).await.unwrap();

        let read = store.get("snapshot").await.unwrap().unwrap();
        assert_eq!(read, b"{\"b\":2}");
        assert!(!dir.join(".snapshot.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let store = FileStore::new(scratch_dir());
        assert!(matches!(
            store.get("../etc/passwd").await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.set("", Vec::new()).await,
            Err(StoreError::InvalidKey(_))
        ));
    }
}

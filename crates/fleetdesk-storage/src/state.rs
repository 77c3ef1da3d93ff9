//! File-backed state store
//!
//! Keeps the whole key space in memory and writes it through to a JSON file
//! on every change, the way browser local storage survives a reload.

use crate::atomic_writer::AtomicWriter;
use crate::traits::{StateStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub struct FileStateStore {
    path: PathBuf,
    state: RwLock<BTreeMap<String, String>>,
}

impl FileStateStore {
    /// Open the store, loading existing state if the file is present
    ///
    /// # Errors
    /// - `StorageError::Io` if the file exists but can't be read
    /// - `StorageError::Serialization` if the file isn't a JSON string map
    pub async fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    StorageError::Serialization(format!("Failed to load state: {}", e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        info!("Opened state store at {:?} ({} keys)", path, state.len());

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, state: &BTreeMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize state: {}", e)))?;

        AtomicWriter::new(&self.path).replace(content.as_bytes())?;

        debug!("Persisted {} keys to {:?}", state.len(), self.path);
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let previous = state.insert(key.to_string(), value);

        // Roll back the in-memory change so memory never runs ahead of disk
        if let Err(e) = self.write_file(&state) {
            match previous {
                Some(old) => state.insert(key.to_string(), old),
                None => state.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let Some(previous) = state.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.write_file(&state) {
            state.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn persist(&self) -> StorageResult<()> {
        let state = self.state.read().await;
        self.write_file(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_and_set() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStateStore::open(temp_dir.path().join("state.json"))
            .await
            .unwrap();

        store.set("accessToken", "abc".to_string()).await.unwrap();
        assert_eq!(store.get("accessToken").await.unwrap().as_deref(), Some("abc"));
        assert!(store.exists("accessToken").await.unwrap());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");

        {
            let store = FileStateStore::open(&path).await.unwrap();
            store.set("app-settings", "{\"themeMode\":\"dark\"}".to_string()).await.unwrap();
            store.set("accessToken", "t".to_string()).await.unwrap();
            store.delete("accessToken").await.unwrap();
        }

        let reopened = FileStateStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("app-settings").await.unwrap().as_deref(),
            Some("{\"themeMode\":\"dark\"}")
        );
        assert!(!reopened.exists("accessToken").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_keys_with_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStateStore::open(temp_dir.path().join("state.json"))
            .await
            .unwrap();

        store.set("table:trips", "1".to_string()).await.unwrap();
        store.set("table:drivers", "2".to_string()).await.unwrap();
        store.set("accessToken", "3".to_string()).await.unwrap();

        let keys = store.list_keys("table:").await.unwrap();
        assert_eq!(keys, vec!["table:drivers".to_string(), "table:trips".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let result = FileStateStore::open(&path).await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        std::fs::write(&path, "").unwrap();

        let store = FileStateStore::open(&path).await.unwrap();
        assert!(store.list_keys("").await.unwrap().is_empty());
    }
}

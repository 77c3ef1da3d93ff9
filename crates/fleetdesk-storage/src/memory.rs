//! In-memory state store

use crate::traits::{StateStore, StorageResult};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Volatile store; used in tests and when durable storage can't be opened
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.state.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        self.state.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.state.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn persist(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStateStore::new();
        store.set("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
        store.persist().await.unwrap();
    }
}

//! Storage trait definitions

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value store for client-side state (session token, preference blobs)
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Get a value from the store
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set a value in the store
    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete a value from the store
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List keys matching a prefix
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Flush state to durable storage
    async fn persist(&self) -> StorageResult<()>;
}

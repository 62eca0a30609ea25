//! In-memory storage

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Storage, StorageError};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let documents = self.documents.read().await;

        Ok(documents
            .range(prefix.to_string()..)
            .map(|(key, _)| key)
            .take_while(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn write_batch(&self, entries: Vec<(String, String)>) -> Result<(), StorageError> {
        self.documents.write().await.extend(entries);

        Ok(())
    }
}

//! Database transactions
//!
//! Every service operation runs inside a [`Transaction`]. Only one transaction is open at a time,
//! so each operation sees the effects of every operation that finished before it. Writes are
//! staged in memory and reach storage in a single batch on [`Transaction::commit`]; dropping a
//! transaction without committing discards them.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::{
    documents::{self, DocumentKey},
    storage::{SqliteStorage, Storage, StorageError},
};

#[derive(Debug, Clone)]
pub struct Db {
    storage: Arc<dyn Storage>,
    writer: Arc<Mutex<()>>,
}

impl Db {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Begin a transaction, waiting for any open transaction to finish first.
    pub async fn begin(&self) -> Transaction {
        let writer = Arc::clone(&self.writer).lock_owned().await;

        Transaction {
            storage: Arc::clone(&self.storage),
            staged: BTreeMap::new(),
            _writer: writer,
        }
    }
}

pub struct Transaction {
    storage: Arc<dyn Storage>,
    staged: BTreeMap<String, String>,
    _writer: OwnedMutexGuard<()>,
}

impl Transaction {
    /// Load the document under `key`, including writes staged by this transaction.
    ///
    /// Missing documents load as `T::default()`.
    pub(crate) async fn load<T>(&self, key: &DocumentKey) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Default,
    {
        let storage_key = key.storage_key();

        let raw = match self.staged.get(&storage_key) {
            Some(raw) => Some(raw.clone()),
            None => self.storage.get(&storage_key).await?,
        };

        match raw {
            Some(raw) => documents::decode(key, &raw),
            None => Ok(T::default()),
        }
    }

    /// Stage a new value for `key`.
    pub(crate) fn stage<T: Serialize>(
        &mut self,
        key: &DocumentKey,
        value: &T,
    ) -> Result<(), StorageError> {
        let raw = documents::encode(key, value)?;

        self.staged.insert(key.storage_key(), raw);

        Ok(())
    }

    /// Keys starting with `prefix`, in storage or staged by this transaction.
    pub(crate) async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: BTreeSet<String> = self.storage.keys(prefix).await?.into_iter().collect();

        keys.extend(
            self.staged
                .keys()
                .filter(|key| key.starts_with(prefix))
                .cloned(),
        );

        Ok(keys.into_iter().collect())
    }

    /// Write every staged document in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the storage backend rejects the batch; nothing is written then.
    pub async fn commit(self) -> Result<(), StorageError> {
        if self.staged.is_empty() {
            return Ok(());
        }

        let entries: Vec<(String, String)> = self.staged.into_iter().collect();

        debug!(documents = entries.len(), "committing transaction");

        self.storage.write_batch(entries).await
    }
}

/// Connect to `SQLite`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established or migrations fail.
pub async fn connect(database_url: &str) -> Result<Db, StorageError> {
    let storage = SqliteStorage::connect(database_url).await?;

    Ok(Db::new(Arc::new(storage)))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::users::models::UserId,
        storage::MemoryStorage,
    };

    use super::*;

    fn memory_db() -> Db {
        Db::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn staged_writes_are_visible_before_commit() -> TestResult {
        let db = memory_db();
        let mut tx = db.begin().await;

        tx.stage(&DocumentKey::Orders(UserId::from("KT")), &Vec::<u32>::new())?;

        let keys = tx.keys("orders_").await?;

        assert_eq!(keys, vec!["orders_KT".to_string()]);

        Ok(())
    }

    #[tokio::test]
    async fn dropped_transaction_writes_nothing() -> TestResult {
        let db = memory_db();

        {
            let mut tx = db.begin().await;

            tx.stage(&DocumentKey::Orders(UserId::from("KT")), &Vec::<u32>::new())?;
        }

        let tx = db.begin().await;

        assert!(tx.keys("orders_").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn committed_writes_reach_later_transactions() -> TestResult {
        let db = memory_db();
        let key = DocumentKey::Orders(UserId::from("KT"));

        let mut tx = db.begin().await;
        tx.stage(&key, &Vec::<u32>::new())?;
        tx.commit().await?;

        let tx = db.begin().await;

        assert_eq!(tx.keys("orders_").await?, vec!["orders_KT".to_string()]);

        Ok(())
    }
}

//! Document storage
//!
//! A flat map from string keys to serialized JSON documents. Backends only need to read single
//! keys, list keys by prefix, and write a batch of keys atomically; everything above that
//! (versioning, transactions, the single writer) lives in [`crate::database`].

use std::fmt::Debug;

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage error")]
    Sql(#[from] sqlx::Error),

    #[error("failed to run storage migrations")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("failed to encode document `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed document `{key}`")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document `{key}` has version {found}; this build reads up to version {supported}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },

    #[error("no migration for document `{key}` from version {from_version}")]
    MissingMigration { key: String, from_version: u32 },
}

#[async_trait]
pub trait Storage: Debug + Send + Sync {
    /// Read the raw document stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// List every key starting with `prefix`, in ascending order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Write all entries or none of them.
    async fn write_batch(&self, entries: Vec<(String, String)>) -> Result<(), StorageError>;
}

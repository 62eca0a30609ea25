//! SQLite storage

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    SqlitePool, query, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

use super::{Storage, StorageError};

const GET_DOCUMENT_SQL: &str = include_str!("sql/get_document.sql");
const LIST_KEYS_SQL: &str = include_str!("sql/list_keys.sql");
const UPSERT_DOCUMENT_SQL: &str = include_str!("sql/upsert_document.sql");

#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect to SQLite and bring the schema up to date.
    ///
    /// In-memory databases are pinned to a single long-lived connection; every new connection
    /// would otherwise see an empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection cannot be established, or the
    /// schema migrations fail.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;

        debug!(database_url, "connected to sqlite storage");

        Ok(Self { pool })
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = query_scalar::<_, String>(GET_DOCUMENT_SQL)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let keys = query_scalar::<_, String>(LIST_KEYS_SQL)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await?;

        Ok(keys)
    }

    async fn write_batch(&self, entries: Vec<(String, String)>) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in entries {
            query(UPSERT_DOCUMENT_SQL)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[tokio::test]
    async fn in_memory_database_round_trips_documents() -> TestResult {
        let storage = SqliteStorage::connect("sqlite::memory:").await?;

        storage
            .write_batch(vec![("books".to_string(), "[]".to_string())])
            .await?;

        assert_eq!(storage.get("books").await?.as_deref(), Some("[]"));
        assert!(storage.get("purchases").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn batch_overwrites_existing_keys() -> TestResult {
        let storage = SqliteStorage::connect("sqlite::memory:").await?;

        storage
            .write_batch(vec![("cart_KT".to_string(), "[1]".to_string())])
            .await?;
        storage
            .write_batch(vec![
                ("cart_KT".to_string(), "[2]".to_string()),
                ("cart_ADMIN".to_string(), "[]".to_string()),
            ])
            .await?;

        assert_eq!(storage.get("cart_KT").await?.as_deref(), Some("[2]"));
        assert_eq!(
            storage.keys("cart_").await?,
            vec!["cart_ADMIN".to_string(), "cart_KT".to_string()]
        );

        Ok(())
    }

    #[tokio::test]
    async fn file_database_persists_across_connections() -> TestResult {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}", dir.path().join("tome.db").display());

        {
            let storage = SqliteStorage::connect(&url).await?;

            storage
                .write_batch(vec![("users".to_string(), "[]".to_string())])
                .await?;
        }

        let reopened = SqliteStorage::connect(&url).await?;

        assert_eq!(reopened.get("users").await?.as_deref(), Some("[]"));

        Ok(())
    }
}

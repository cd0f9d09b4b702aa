use std::{collections::HashMap, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};

use crate::error::StoreError;

use super::Database;

/// Durable storage keyed by string, holding JSON values.
///
/// A `put` either replaces the whole value for a key or fails without
/// touching it. There are no multi-key transactions.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Open the backing store. Idempotent.
    async fn open(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value for `key`, returning the committed value.
    async fn put(&self, key: &str, value: Value) -> Result<Value, StoreError>;
}

/// SQLite-backed store, opened on first use.
pub struct SqliteStore {
    path: PathBuf,
    db: OnceCell<Database>,
}

impl SqliteStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            db: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn database(&self) -> Result<&Database, StoreError> {
        self.db
            .get_or_try_init(|| async {
                let path = self.path.clone();
                tokio::task::spawn_blocking(move || Database::new(path))
                    .await
                    .context("database open task panicked")
                    .and_then(|result| result)
                    .map_err(StoreError::unavailable)
            })
            .await
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn open(&self) -> Result<(), StoreError> {
        self.database().await.map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.database()
            .await?
            .get_value(key)
            .await
            .map_err(StoreError::unavailable)
    }

    async fn put(&self, key: &str, value: Value) -> Result<Value, StoreError> {
        self.database()
            .await?
            .put_value(key, &value)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(value)
    }
}

/// In-process store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn open(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<Value, StoreError> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn sqlite_store_opens_lazily_and_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("timo-client.sqlite3");

        let store = SqliteStore::new(path.clone());
        assert!(!path.exists());

        store.open().await.unwrap();
        store.open().await.unwrap();
        assert!(path.exists());

        let committed = store.put("categories", json!(["Work"])).await.unwrap();
        assert_eq!(committed, json!(["Work"]));
        drop(store);

        let reopened = SqliteStore::new(path);
        assert_eq!(
            reopened.get("categories").await.unwrap(),
            Some(json!(["Work"]))
        );
        assert_eq!(reopened.get("timers").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_store_reports_unavailable_when_path_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"plain file").unwrap();
        let store = SqliteStore::new(blocker.join("timo-client.sqlite3"));

        let err = store.get("timers").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.get("timers").await.unwrap(), None);
        store.put("timers", json!([])).await.unwrap();
        assert_eq!(store.get("timers").await.unwrap(), Some(json!([])));
    }
}

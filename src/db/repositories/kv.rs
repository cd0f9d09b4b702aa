use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use crate::db::Database;

impl Database {
    /// Read the JSON value stored under `key`, `None` when never written.
    pub async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let raw: Option<String> = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
                .with_context(|| format!("failed to read key '{key}'"))?;

            raw.map(|text| {
                serde_json::from_str(&text)
                    .with_context(|| format!("stored value for '{key}' is not valid JSON"))
            })
            .transpose()
        })
        .await
    }

    /// Replace the value stored under `key` in a single statement.
    pub async fn put_value(&self, key: &str, value: &Value) -> Result<()> {
        let key = key.to_string();
        let encoded = serde_json::to_string(value).context("failed to encode value")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, encoded, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key '{key}'"))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::Database;

    #[tokio::test]
    async fn put_replaces_whole_value() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("kv.sqlite3")).unwrap();

        assert_eq!(db.get_value("timers").await.unwrap(), None);

        db.put_value("timers", &json!([1, 2, 3])).await.unwrap();
        db.put_value("timers", &json!(["only"])).await.unwrap();

        assert_eq!(db.get_value("timers").await.unwrap(), Some(json!(["only"])));
        assert_eq!(db.get_value("categories").await.unwrap(), None);
    }
}

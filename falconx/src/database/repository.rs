//! Repository layer for local storage
//!
//! A string key/value table mirroring the browser's `localStorage`,
//! with JSON helpers for the typed documents stored under its keys.

use super::models::StoredValue;
use crate::error::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

/// Repository for local storage operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Read a raw value
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_storage WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Read a value together with its write time
    pub async fn get_entry(&self, key: &str) -> Result<Option<StoredValue>> {
        let entry = sqlx::query_as::<_, StoredValue>(
            r#"
            SELECT key, value, updated_at FROM local_storage WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Insert or replace a raw value
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored local value: {} ({} bytes)", key, value.len());
        Ok(())
    }

    /// Remove a key; missing keys are ignored
    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Removed local value: {}", key);
        Ok(())
    }

    /// List keys starting with a prefix
    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT key FROM local_storage WHERE substr(key, 1, length(?)) = ? ORDER BY key
            "#,
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// Read and deserialize a JSON value
    ///
    /// A value that no longer parses is reported as absent.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable local value {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Serialize and store a JSON value
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

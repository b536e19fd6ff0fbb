//! Session-scoped key/value storage
//!
//! Values live only as long as the process, like a browser tab's
//! `sessionStorage`. Clones share the same underlying map.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct SessionStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) {
        self.values.write().await.insert(key.to_string(), value.into());
    }

    pub async fn remove(&self, key: &str) {
        self.values.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.values.write().await.clear();
    }

    /// Read a JSON value; unreadable values count as absent
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session value {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw).await;
        Ok(())
    }
}

//! In-memory store, useful for testing and ephemeral sessions.
//!
//! An optional byte quota mimics a browser's local-storage limit: a save
//! that would push the total serialized size past the quota fails with
//! `StorageError::QuotaExceeded` and leaves the previous value in place.

use async_trait::async_trait;
use parley_core::error::StorageError;
use parley_core::store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store keeping serialized JSON per key.
#[derive(Clone)]
pub struct InMemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            values: Arc::new(RwLock::new(HashMap::new())),
            quota_bytes: None,
        }
    }

    /// Limit the total bytes held across all keys.
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Total serialized bytes currently held.
    pub async fn used_bytes(&self) -> usize {
        self.values
            .read()
            .await
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let values = self.values.read().await;
        let Some(raw) = values.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|e| StorageError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let mut values = self.values.write().await;
        if let Some(limit) = self.quota_bytes {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + raw.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }
        values.insert(key.to_string(), raw);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_load_remove() {
        let store = InMemoryStore::new();
        assert_eq!(store.load("k").await.unwrap(), None);
        store.save("k", &json!(["a"])).await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), Some(json!(["a"])));
        assert!(store.remove("k").await.unwrap());
        assert!(!store.remove("k").await.unwrap());
    }

    #[tokio::test]
    async fn clones_share_contents() {
        let store = InMemoryStore::new();
        let handle = store.clone();
        store.save("k", &json!(1)).await.unwrap();
        assert_eq!(handle.load("k").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn quota_exceeded_keeps_previous_value() {
        let store = InMemoryStore::new().with_quota(16);
        store.save("k", &json!("small")).await.unwrap();

        let err = store.save("k", &json!("this value is far too large")).await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
        assert_eq!(store.load("k").await.unwrap(), Some(json!("small")));
    }

    #[tokio::test]
    async fn quota_counts_replacement_not_sum() {
        let store = InMemoryStore::new().with_quota(12);
        store.save("k", &json!("12345")).await.unwrap();
        store.save("k", &json!("54321")).await.unwrap();
        assert_eq!(store.used_bytes().await, 1 + 7);
    }
}

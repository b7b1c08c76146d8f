//! No-op store: disables persistence entirely.

use async_trait::async_trait;
use parley_core::error::StorageError;
use parley_core::store::Store;

/// A store that keeps nothing.
pub struct NoopStore;

#[async_trait]
impl Store for NoopStore {
    fn name(&self) -> &str { "none" }

    async fn load(&self, _key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(None)
    }

    async fn save(&self, _key: &str, _value: &serde_json::Value) -> Result<(), StorageError> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> Result<bool, StorageError> {
        Ok(false)
    }
}

//! Store trait: the key-value persistence the conversation log writes
//! through to.
//!
//! Values are JSON documents addressed by string keys. The log itself is
//! adapter-agnostic; the session saves its serialized form after every
//! mutation and restores it at startup.
//!
//! Implementations: JSON files on disk, in-memory (for testing), none (no-op).

use async_trait::async_trait;

use crate::error::StorageError;

/// Storage key holding the serialized message log.
pub const HISTORY_KEY: &str = "ai_chat_messages";

/// The core Store trait.
#[async_trait]
pub trait Store: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Read the value under `key`, `None` if absent.
    async fn load(&self, key: &str) -> std::result::Result<Option<serde_json::Value>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &serde_json::Value) -> std::result::Result<(), StorageError>;

    /// Delete `key`. Returns whether anything was removed.
    async fn remove(&self, key: &str) -> std::result::Result<bool, StorageError>;
}

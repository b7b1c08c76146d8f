//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Parley operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Message validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Remote completion ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Persistence ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Session state ---
    #[error("A message is being sent, try again once it completes")]
    Busy,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Rejected message content. Raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message content must not be empty")]
    EmptyContent,
}

/// Failure of the remote completion call.
///
/// The orchestrator treats every variant the same way (roll back and
/// notify); the variants exist so the notice can say what went wrong.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("API Error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("Rate limited by provider (status: 429)")]
    RateLimited,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid response format from API: {0}")]
    MalformedResponse(String),

    #[error("Transport not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl TransportError {
    /// HTTP status code associated with this failure, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            Self::RateLimited => Some(429),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("Failed to serialize value for key '{key}': {reason}")]
    Serialization { key: String, reason: String },

    #[error("Storage I/O failed for key '{key}': {reason}")]
    Io { key: String, reason: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_status_and_message() {
        let err = Error::Transport(TransportError::Api {
            status_code: 500,
            message: "Internal error".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("Internal error"));
    }

    #[test]
    fn status_code_only_for_server_answers() {
        assert_eq!(TransportError::RateLimited.status_code(), Some(429));
        assert_eq!(TransportError::Network("reset".into()).status_code(), None);
    }

    #[test]
    fn quota_error_mentions_limit() {
        let err = StorageError::QuotaExceeded { needed: 120, limit: 100 };
        assert!(err.to_string().contains("100"));
    }
}

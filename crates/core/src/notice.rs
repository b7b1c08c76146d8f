//! User-facing notices.
//!
//! Fire-and-forget: the sink displays each notice once and reports nothing
//! back.

use std::sync::Mutex;

pub const OFFLINE_NOTICE: &str = "No internet connection. Please check your network and try again.";
pub const SEND_FAILED_NOTICE: &str = "Failed to get AI response. Please try again.";
pub const SAVE_FAILED_NOTICE: &str = "Failed to save conversation. Storage may be full.";
pub const CONNECTION_LOST_NOTICE: &str = "Connection lost. Please check your internet connection.";

pub trait NoticeSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// Keeps every notice in order. Used by tests and embedders that render
/// notices themselves.
#[derive(Debug, Default)]
pub struct CollectingNotices {
    notices: Mutex<Vec<String>>,
}

impl CollectingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.notices.lock().map(|n| n.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeSink for CollectingNotices {
    fn notify(&self, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(message.to_string());
        }
    }
}

//! The bounded, ordered message log.
//!
//! Entries are kept oldest first. Appending past `capacity` evicts from the
//! front. The log remembers what its most recent append evicted, so that
//! `remove_last` undoes that append exactly, including at capacity.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::message::{Message, Role};

/// Default maximum number of retained messages.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// An ordered, capacity-bounded sequence of messages.
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<Message>,
    capacity: usize,
    /// Entries pushed out by the latest append, oldest first.
    evicted_by_last_append: Vec<Message>,
}

/// What `restore` did with the raw records it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Records now in the log
    pub kept: usize,
    /// Malformed records filtered out
    pub dropped: usize,
    /// Valid records discarded to respect capacity
    pub trimmed: usize,
}

impl MessageLog {
    /// Create an empty log. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            evicted_by_last_append: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.back()
    }

    /// Append a new message, evicting the oldest entries past capacity.
    pub fn append(
        &mut self,
        content: impl Into<String>,
        role: Role,
    ) -> Result<Message, ValidationError> {
        let message = Message::new(role, content)?;
        self.entries.push_back(message.clone());

        self.evicted_by_last_append.clear();
        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                self.evicted_by_last_append.push(old);
            }
        }
        if !self.evicted_by_last_append.is_empty() {
            debug!(
                evicted = self.evicted_by_last_append.len(),
                capacity = self.capacity,
                "Evicted oldest messages"
            );
        }

        Ok(message)
    }

    /// Remove and return the most recent message.
    ///
    /// If that message's append evicted older entries, they are put back at
    /// the front, leaving the log as it was before the append.
    pub fn remove_last(&mut self) -> Option<Message> {
        let removed = self.entries.pop_back()?;
        for old in self.evicted_by_last_append.drain(..).rev() {
            self.entries.push_front(old);
        }
        Some(removed)
    }

    /// Replace the contents with the valid records in `raw`.
    ///
    /// Never fails: a value that is not an array restores an empty log and
    /// malformed records are skipped. After filtering, only the newest
    /// `capacity` records are kept.
    pub fn restore(&mut self, raw: &serde_json::Value) -> RestoreReport {
        self.entries.clear();
        self.evicted_by_last_append.clear();

        let Some(records) = raw.as_array() else {
            if !raw.is_null() {
                warn!("Stored history is not an array, starting empty");
            }
            return RestoreReport::default();
        };

        let mut restored: VecDeque<Message> = records.iter().filter_map(Message::from_record).collect();
        let dropped = records.len() - restored.len();
        if dropped > 0 {
            warn!(dropped, "Skipping malformed history records");
        }

        let trimmed = restored.len().saturating_sub(self.capacity);
        restored.drain(..trimmed);
        self.entries = restored;

        debug!(kept = self.entries.len(), dropped, trimmed, "Message log restored");
        RestoreReport {
            kept: self.entries.len(),
            dropped,
            trimmed,
        }
    }

    /// The most recent `n` entries (or fewer), oldest first.
    pub fn windowed(&self, n: usize) -> Vec<&Message> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    /// The persisted form: an array of records, oldest first.
    pub fn serialize(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.entries)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted_by_last_append.clear();
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

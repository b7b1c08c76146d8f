//! Export document: a self-describing snapshot of the conversation.
//!
//! `{"messages": [...records...], "exportDate": "…Z", "version": "1.0"}`

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::log::MessageLog;
use crate::message::{Message, format_timestamp};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub messages: Vec<Message>,
    pub export_date: String,
    pub version: String,
}

impl ExportDocument {
    pub fn from_log(log: &MessageLog) -> Self {
        Self::at(log, Utc::now())
    }

    pub fn at(log: &MessageLog, now: DateTime<Utc>) -> Self {
        Self {
            messages: log.iter().cloned().collect(),
            export_date: format_timestamp(&now.trunc_subsecs(3)),
            version: EXPORT_VERSION.into(),
        }
    }

    /// Two-space indented JSON, as written to export files.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested file name: `ai-chat-export-YYYY-MM-DD.json`.
    pub fn file_name(now: DateTime<Utc>) -> String {
        format!("ai-chat-export-{}.json", now.format("%Y-%m-%d"))
    }
}

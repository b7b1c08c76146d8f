//! Message domain types.
//!
//! A `Message` is the unit stored in the conversation log and persisted to
//! the key-value store. Its serialized form is the persisted record:
//! `{"id": …, "content": "…", "type": "user" | "ai", "timestamp": "…Z"}`.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::trace;

use crate::error::ValidationError;

/// Unique identifier for a message.
///
/// Freshly generated ids are epoch milliseconds plus a random fraction as
/// the tie-break, stored as a JSON number. Older stored data may carry
/// integer or string ids; those are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    // Must precede `Numeric` so whole numbers are not widened to floats.
    Integer(i64),
    Numeric(f64),
    Text(String),
}

impl MessageId {
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis() as f64;
        Self::Numeric(millis + rand::random::<f64>())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The end user
    #[serde(rename = "user")]
    User,
    /// The model's reply
    #[serde(rename = "ai")]
    Assistant,
}

impl Role {
    /// The persisted `type` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "ai",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(Role::User),
            "ai" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,

    content: String,

    #[serde(rename = "type")]
    role: Role,

    /// Creation time, millisecond precision. Display only.
    #[serde(rename = "timestamp", with = "iso_millis")]
    created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Result<Self, ValidationError> {
        let content = content.into();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(Self {
            id: MessageId::generate(),
            content,
            role,
            created_at: Utc::now().trunc_subsecs(3),
        })
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(Role::Assistant, content)
    }

    /// Rebuild a message from one persisted record.
    ///
    /// Returns `None` for anything that is not a usable record: missing or
    /// empty `content`, missing or unknown `type`, missing or unparseable
    /// `timestamp`. A missing `id` is replaced with a fresh one.
    pub fn from_record(value: &serde_json::Value) -> Option<Self> {
        let raw = match RawRecord::deserialize(value) {
            Ok(raw) => raw,
            Err(e) => {
                trace!(error = %e, "Record is not an object of the expected shape");
                return None;
            }
        };

        let content = raw.content.filter(|c| !c.is_empty())?;
        let role = raw.role.as_deref().and_then(Role::from_tag)?;
        let created_at = raw.timestamp.as_deref().and_then(parse_timestamp)?;

        Some(Self {
            id: raw.id.unwrap_or_else(MessageId::generate),
            content,
            role,
            created_at,
        })
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Lenient view of a stored record; every field may be absent.
#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<MessageId>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, rename = "type")]
    role: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Render a timestamp the way stored records carry it (`…T…:…:….sssZ`).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

mod iso_millis {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

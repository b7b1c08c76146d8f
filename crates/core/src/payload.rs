//! Conversation payloads sent to the remote completion API.
//!
//! A payload is a fixed two-turn preamble (instruction, acknowledgement)
//! followed by a window of recent log entries, mapped onto the remote
//! `user` / `model` role vocabulary. Payloads are never persisted.

use serde::{Deserialize, Serialize};

use crate::log::MessageLog;
use crate::message::{Message, Role};

/// Default number of log entries carried as context.
pub const DEFAULT_WINDOW: usize = 40;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a smart AI that answers in a relaxed, friendly, and clear style. \
Give responses that are helpful, accurate, and easy to understand. \
When asked to explain something complex, use examples or relatable analogies. \
Always keep a positive and supportive tone.";

pub const DEFAULT_ACKNOWLEDGEMENT: &str =
    "Understood. I will respond in a friendly, casual, and clear manner as requested.";

/// Role of a turn in the remote vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl From<Role> for TurnRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => TurnRole::User,
            Role::Assistant => TurnRole::Model,
        }
    }
}

/// One role-tagged content unit in a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: TurnRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: TurnRole::Model, text: text.into() }
    }
}

impl From<&Message> for Turn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role().into(),
            text: message.content().to_string(),
        }
    }
}

/// The instruction/acknowledgement pair that opens every payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPreamble {
    pub instruction: String,
    pub acknowledgement: String,
}

impl SystemPreamble {
    pub fn new(instruction: impl Into<String>, acknowledgement: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            acknowledgement: acknowledgement.into(),
        }
    }
}

impl Default for SystemPreamble {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_ACKNOWLEDGEMENT)
    }
}

/// Ordered turns for one outbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Append the new user message as the final turn.
    pub fn with_prompt(mut self, text: impl Into<String>) -> Self {
        self.turns.push(Turn::user(text));
        self
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(|t| t.text.len() / 4).sum()
    }
}

/// Build the payload for `log`: preamble, then the last `window` entries.
pub fn build_payload(log: &MessageLog, preamble: &SystemPreamble, window: usize) -> Conversation {
    let history = log.windowed(window);
    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(Turn::user(preamble.instruction.clone()));
    turns.push(Turn::model(preamble.acknowledgement.clone()));
    turns.extend(history.into_iter().map(Turn::from));
    Conversation { turns }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_yields_preamble_only() {
        let payload = build_payload(&MessageLog::default(), &SystemPreamble::default(), DEFAULT_WINDOW);
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.turns[0].role, TurnRole::User);
        assert_eq!(payload.turns[0].text, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(payload.turns[1], Turn::model(DEFAULT_ACKNOWLEDGEMENT));
    }

    #[test]
    fn roles_map_to_remote_vocabulary() {
        let mut log = MessageLog::default();
        log.append("Hi", Role::User).unwrap();
        log.append("Hello!", Role::Assistant).unwrap();

        let payload = build_payload(&log, &SystemPreamble::new("be nice", "ok"), DEFAULT_WINDOW);
        assert_eq!(
            payload.turns[2..],
            [Turn::user("Hi"), Turn::model("Hello!")]
        );
    }

    #[test]
    fn window_bounds_history() {
        let mut log = MessageLog::default();
        for i in 0..45 {
            log.append(format!("m{i}"), Role::User).unwrap();
        }
        let payload = build_payload(&log, &SystemPreamble::default(), 40);
        assert_eq!(payload.len(), 42);
        assert_eq!(payload.turns[2].text, "m5");
        assert_eq!(payload.turns[41].text, "m44");
    }

    #[test]
    fn build_is_deterministic() {
        let mut log = MessageLog::default();
        log.append("same", Role::User).unwrap();
        let preamble = SystemPreamble::default();
        assert_eq!(build_payload(&log, &preamble, 40), build_payload(&log, &preamble, 40));
    }

    #[test]
    fn prompt_is_final_user_turn() {
        let payload = build_payload(&MessageLog::default(), &SystemPreamble::default(), 40)
            .with_prompt("What's new?");
        assert_eq!(payload.turns.last(), Some(&Turn::user("What's new?")));
    }

    #[test]
    fn turn_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::model("x")).unwrap();
        assert!(json.contains("\"model\""));
    }
}

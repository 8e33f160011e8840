//! UI-agnostic conversation types
//!
//! These are the records the controller produces and any front end (the
//! terminal UI today) consumes. Nothing here depends on a UI framework.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Greeting the conversation starts with and returns to on reset
pub const SEED_GREETING: &str =
    "Hello! I'm your AI assistant powered by Ollama. How can I help you today?";

/// Identifier of a message within one controller's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing message ids.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> MessageId {
        self.next += 1;
        MessageId(self.next)
    }
}

/// Who a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// A single entry in the conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
    pub is_error: bool,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self::build(id, content.into(), Sender::User, false)
    }

    pub fn assistant(id: MessageId, content: impl Into<String>) -> Self {
        Self::build(id, content.into(), Sender::Assistant, false)
    }

    /// Assistant-slot entry standing in for a failed request
    pub fn error(id: MessageId, content: impl Into<String>) -> Self {
        Self::build(id, content.into(), Sender::Assistant, true)
    }

    fn build(id: MessageId, content: String, sender: Sender, is_error: bool) -> Self {
        Self {
            id,
            content,
            sender,
            timestamp: Local::now(),
            is_error,
        }
    }

    /// Display time, e.g. `14:05`
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Read-only view of the conversation handed to renderers
#[derive(Debug, Clone, Copy)]
pub struct ConversationSnapshot<'a> {
    pub messages: &'a [Message],
    pub is_loading: bool,
}

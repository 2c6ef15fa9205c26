//! Append-only conversation log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryRole {
    User,
    Model,
    /// Result of a command the router executed
    SystemCommand,
}

/// A single turn in the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub parts: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered log of every turn in a chat.
///
/// Entries are only ever pushed; nothing hands out mutable access to an
/// entry once it is stored.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new entry to the history
    pub fn push(&mut self, role: HistoryRole, parts: impl Into<String>) {
        self.entries.push(HistoryEntry {
            role,
            parts: parts.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn push_user(&mut self, parts: impl Into<String>) {
        self.push(HistoryRole::User, parts);
    }

    pub fn push_model(&mut self, parts: impl Into<String>) {
        self.push(HistoryRole::Model, parts);
    }

    pub fn push_system_command(&mut self, parts: impl Into<String>) {
        self.push(HistoryRole::SystemCommand, parts);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries added after the first `start` ones.
    pub fn since(&self, start: usize) -> &[HistoryEntry] {
        &self.entries[start.min(self.entries.len())..]
    }
}

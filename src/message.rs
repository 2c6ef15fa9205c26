//! Messages handed to the chat UI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who a display message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Loading,
    Error,
    Success,
}

/// A chat bubble. Built by the router or controller, owned by the UI afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_data: Option<Map<String, Value>>,
}

/// Content shown when a turn fails, whatever the cause.
pub const GENERIC_ERROR_CONTENT: &str = "An error occurred";

impl DisplayMessage {
    pub fn new(id: u64, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            status: None,
            system_type: None,
            system_data: None,
        }
    }

    pub fn user(id: u64, content: impl Into<String>) -> Self {
        Self::new(id, MessageKind::User, content)
    }

    pub fn ai(id: u64, content: impl Into<String>) -> Self {
        Self::new(id, MessageKind::Ai, content)
    }

    pub fn error(id: u64) -> Self {
        Self::ai(id, GENERIC_ERROR_CONTENT).with_status(MessageStatus::Error)
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = Some(system_type.into());
        self
    }

    pub fn with_system_data(mut self, data: Map<String, Value>) -> Self {
        if !data.is_empty() {
            self.system_data = Some(data);
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(MessageStatus::Error)
    }
}

/// Hands out increasing message ids for one rendering session.
#[derive(Debug, Clone, Default)]
pub struct MessageIds {
    last: u64,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    pub fn last(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn ids_strictly_increase() {
        let mut ids = MessageIds::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_eq!(first, 1);
        assert!(second > first);
        assert_eq!(ids.last(), second);
    }

    #[test]
    fn serializes_with_ui_field_names() {
        let mut data = Map::new();
        data.insert("balance".into(), json!("1000"));
        let message = DisplayMessage::ai(3, "hello")
            .with_status(MessageStatus::Success)
            .with_system_type("WALLET_BALANCE")
            .with_system_data(data);

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], json!("ai"));
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["systemType"], json!("WALLET_BALANCE"));
        assert_eq!(value["systemData"], json!({"balance": "1000"}));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let value = serde_json::to_value(DisplayMessage::user(1, "hi")).unwrap();
        assert!(value.get("status").is_none());
        assert!(value.get("systemType").is_none());
        assert!(value.get("systemData").is_none());
    }

    #[test]
    fn error_message_uses_generic_content() {
        let message = DisplayMessage::error(9);
        assert!(message.is_error());
        assert_eq!(message.kind, MessageKind::Ai);
        assert_eq!(message.content, GENERIC_ERROR_CONTENT);
    }
}

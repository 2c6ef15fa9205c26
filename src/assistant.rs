use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::commands::Command;
use crate::error::AssistantError;
use crate::history::ConversationHistory;
use crate::prompts::{self, SystemNotice};

/// Speaker of a transcript turn, as the AI service names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

/// One turn the AI service has seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ModelTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Text completion capability: given the transcript so far, produce the next model turn.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, transcript: &[ModelTurn]) -> Result<String, AssistantError>;
}

/// Structured command parsed out of a model reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandEnvelope {
    pub command: Command,
    pub text: String,
    pub data: Map<String, Value>,
}

impl CommandEnvelope {
    pub fn new(command: impl Into<Command>, text: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            text: text.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// One live conversation with the AI service.
///
/// The transcript is what the service sees on every call: the instruction
/// preamble, the canned acknowledgment, then every user turn and raw reply.
/// The [`ConversationHistory`] passed into [`send_message`](Self::send_message)
/// is the display-side log and only ever receives user text and parsed replies.
pub struct AssistantSession<M> {
    model: M,
    transcript: Vec<ModelTurn>,
}

impl<M: ChatModel> AssistantSession<M> {
    /// Start a session primed with the standard preamble and acknowledgment.
    pub fn new(model: M) -> Self {
        Self::with_instructions(model, prompts::instruction_preamble())
    }

    pub fn with_instructions(model: M, instructions: impl Into<String>) -> Self {
        Self {
            model,
            transcript: vec![
                ModelTurn::user(instructions),
                ModelTurn::model(prompts::ACKNOWLEDGMENT),
            ],
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn transcript(&self) -> &[ModelTurn] {
        &self.transcript
    }

    /// Send user text and parse the reply into a command envelope.
    ///
    /// The user turn is logged before the call. The model turn is logged only
    /// once the reply parses, and carries the envelope text, not the raw reply.
    pub async fn send_message(
        &mut self,
        text: &str,
        history: &mut ConversationHistory,
    ) -> Result<CommandEnvelope, AssistantError> {
        history.push_user(text);
        self.transcript.push(ModelTurn::user(text));

        let reply = match self.model.complete(&self.transcript).await {
            Ok(reply) => reply,
            Err(error) => {
                // the service never saw this turn
                self.transcript.pop();
                tracing::warn!(%error, "AI service call failed");
                return Err(error);
            }
        };
        self.transcript.push(ModelTurn::model(reply.clone()));
        tracing::debug!(reply = %reply, "AI reply received");

        let envelope = parse_envelope(&reply).inspect_err(|error| {
            tracing::warn!(%error, "Discarding malformed AI reply");
        })?;

        history.push_model(envelope.text.clone());
        Ok(envelope)
    }

    /// Feed a corrective system notice back to the assistant.
    pub async fn send_notice(
        &mut self,
        notice: SystemNotice,
        history: &mut ConversationHistory,
    ) -> Result<CommandEnvelope, AssistantError> {
        tracing::debug!(?notice, "Sending corrective notice");
        self.send_message(&notice.render(), history).await
    }
}

/// Validate a raw reply against the `{type, msg, data?}` envelope.
///
/// The reply is untrusted. A Markdown code fence around the object is
/// tolerated, anything else that is not exactly one JSON object with string
/// `type` and `msg` fields is rejected.
pub fn parse_envelope(reply: &str) -> Result<CommandEnvelope, AssistantError> {
    let object = extract_object(reply)
        .ok_or_else(|| AssistantError::protocol("reply does not contain a JSON object", reply))?;

    let value: Value = serde_json::from_str(object)
        .map_err(|error| AssistantError::protocol(format!("invalid JSON: {error}"), reply))?;
    let fields = value
        .as_object()
        .ok_or_else(|| AssistantError::protocol("reply is not a JSON object", reply))?;

    let tag = fields
        .get("type")
        .and_then(Value::as_str)
        .filter(|tag| !tag.trim().is_empty())
        .ok_or_else(|| AssistantError::protocol("missing string field `type`", reply))?;
    let text = fields
        .get("msg")
        .and_then(Value::as_str)
        .ok_or_else(|| AssistantError::protocol("missing string field `msg`", reply))?;
    let data = match fields.get("data") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(data)) => data.clone(),
        Some(_) => return Err(AssistantError::protocol("`data` must be an object", reply)),
    };

    Ok(CommandEnvelope {
        command: Command::from_tag(tag),
        text: text.to_string(),
        data,
    })
}

fn extract_object(reply: &str) -> Option<&str> {
    let mut body = reply.trim();
    if let Some(fenced) = body.strip_prefix("```") {
        // an info string (```json) holds no brace, so the object search skips it
        let fenced = fenced.trim_end();
        body = fenced.strip_suffix("```").unwrap_or(fenced);
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

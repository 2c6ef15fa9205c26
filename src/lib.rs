//! Chat-driven wallet assistant.
//!
//! A user message goes to the AI service through an [`AssistantSession`]; the
//! reply is validated into a [`CommandEnvelope`], dispatched by the
//! [`CommandRouter`] against a [`WalletFacade`], and comes back as a
//! [`DisplayMessage`]. [`ChatController`] ties one conversation together.

pub mod assistant;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod gemini;
pub mod history;
pub mod message;
pub mod prompts;
pub mod router;
pub mod wallet;

#[cfg(test)]
mod test_support;

pub use assistant::{AssistantSession, ChatModel, CommandEnvelope, ModelTurn, TurnRole};
pub use commands::{Command, CommandKind};
pub use config::Config;
pub use controller::{ChatController, Exchange, SharedChat};
pub use error::{AssistantError, Error, WalletError};
pub use gemini::GeminiClient;
pub use history::{ConversationHistory, HistoryEntry, HistoryRole};
pub use message::{DisplayMessage, MessageIds, MessageKind, MessageStatus};
pub use router::{CommandRouter, Routed, RouterContext};
pub use wallet::{DevProvider, WalletFacade, WalletManager};

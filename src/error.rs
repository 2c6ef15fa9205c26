//! Error types for chaindash.

/// Top-level error type for a chat turn.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Assistant error: {0}")]
    Assistant(#[from] AssistantError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// A message was submitted while the previous one was still in flight.
    #[error("A message is already being processed")]
    Busy,
}

/// Failures talking to the AI service or understanding its reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    /// The service could not be reached, rejected the request, or timed out.
    #[error("AI service request failed: {0}")]
    Upstream(String),

    /// The service answered, but not with a `{type, msg, data?}` object.
    #[error("AI reply is not a valid command envelope: {reason}")]
    Protocol { reason: String, reply: String },
}

impl AssistantError {
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn protocol(reason: impl Into<String>, reply: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
            reply: reply.into(),
        }
    }
}

/// Failures raised by a wallet facade or its signing provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("No signing provider found. Please install a wallet extension.")]
    NoProvider,

    #[error("The user rejected the connection request")]
    UserRejected,

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Invalid recipient address: {0}")]
    InvalidAddress(String),

    #[error("Invalid transfer amount: {0}")]
    InvalidAmount(String),

    /// The provider's next nonce does not advance past the last one used.
    #[error("Invalid nonce sequence: next {next} is not greater than last {last}")]
    Nonce { next: u64, last: u64 },

    #[error("Provider error: {0}")]
    Provider(String),
}

/// A command tag outside the known vocabulary.
///
/// Only strict tag parsing returns this. The router answers an unknown tag
/// with a corrective notice, so it never reaches [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognized command tag: {0}")]
pub struct UnrecognizedCommand(pub String);

pub type Result<T> = std::result::Result<T, Error>;

//! One chat: owns the history, the assistant session and the wallet, and
//! turns each user submission into display messages.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::assistant::{AssistantSession, ChatModel};
use crate::config::Config;
use crate::error::Error;
use crate::history::ConversationHistory;
use crate::message::{DisplayMessage, MessageIds};
use crate::router::{CommandRouter, Routed, RouterContext};
use crate::wallet::WalletFacade;

/// Messages produced by one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub user: DisplayMessage,
    /// Zero or one assistant message
    pub replies: Vec<DisplayMessage>,
}

pub struct ChatController<M, W> {
    session_id: Uuid,
    history: ConversationHistory,
    session: AssistantSession<M>,
    wallet: W,
    ids: MessageIds,
    max_corrections: u32,
}

impl<M: ChatModel, W: WalletFacade> ChatController<M, W> {
    pub fn new(model: M, wallet: W) -> Self {
        Self::with_session(AssistantSession::new(model), wallet)
    }

    pub fn with_session(session: AssistantSession<M>, wallet: W) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            history: ConversationHistory::new(),
            session,
            wallet,
            ids: MessageIds::new(),
            max_corrections: 1,
        }
    }

    pub fn from_config(model: M, wallet: W, config: &Config) -> Self {
        Self::new(model, wallet).with_max_corrections(config.assistant.max_corrections)
    }

    pub fn with_max_corrections(mut self, max_corrections: u32) -> Self {
        self.max_corrections = max_corrections;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn session(&self) -> &AssistantSession<M> {
        &self.session
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut W {
        &mut self.wallet
    }

    /// Run one user turn. Failures never escape: they become an error bubble.
    pub async fn submit(&mut self, text: &str) -> Exchange {
        let user = DisplayMessage::user(self.ids.next_id(), text);
        let span = tracing::info_span!("chat_turn", session = %self.session_id, message = user.id);

        let replies = match self.run_turn(text).instrument(span.clone()).await {
            Ok(reply) => reply.into_iter().collect(),
            Err(error) => {
                span.in_scope(|| tracing::error!(%error, "Chat turn failed"));
                vec![DisplayMessage::error(self.ids.next_id())]
            }
        };

        Exchange { user, replies }
    }

    async fn run_turn(&mut self, text: &str) -> Result<Option<DisplayMessage>, Error> {
        let mut envelope = self.session.send_message(text, &mut self.history).await?;
        let mut corrections = 0;

        loop {
            let ctx = RouterContext {
                history: &mut self.history,
                session: &mut self.session,
                wallet: &mut self.wallet,
                ids: &mut self.ids,
                may_reprompt: corrections < self.max_corrections,
            };
            match CommandRouter::handle(&envelope, ctx).await? {
                Routed::Display(message) => return Ok(Some(message)),
                Routed::Reprompted(corrected) => {
                    corrections += 1;
                    envelope = corrected;
                }
                Routed::Unhandled => {
                    tracing::debug!(corrections, "Turn ended without an actionable command");
                    return Ok(None);
                }
            }
        }
    }
}

/// A controller shared between UI handles.
///
/// Holding the lock is the busy flag: a second submission while one is in
/// flight is refused with [`Error::Busy`] instead of queueing.
pub struct SharedChat<M, W> {
    inner: Arc<Mutex<ChatController<M, W>>>,
}

impl<M, W> Clone for SharedChat<M, W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ChatModel, W: WalletFacade> SharedChat<M, W> {
    pub fn new(controller: ChatController<M, W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub async fn submit(&self, text: &str) -> Result<Exchange, Error> {
        let mut controller = self.inner.try_lock().map_err(|_| {
            tracing::debug!("Submission refused, a turn is in flight");
            Error::Busy
        })?;
        Ok(controller.submit(text).await)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Wait for the current turn, then borrow the controller.
    pub async fn lock(&self) -> MutexGuard<'_, ChatController<M, W>> {
        self.inner.lock().await
    }
}

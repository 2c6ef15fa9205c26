//! Deterministic stand-ins for the AI service and the wallet.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::assistant::{ChatModel, ModelTurn};
use crate::error::{AssistantError, WalletError};
use crate::wallet::{Connection, TxReceipt, WalletFacade, WalletSessionState};

/// Replays queued replies in order and records every transcript it was sent.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, AssistantError>>>,
    calls: Mutex<Vec<Vec<ModelTurn>>>,
}

impl ScriptedModel {
    pub(crate) fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(AssistantError::upstream(message))])),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ModelTurn>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, transcript: &[ModelTurn]) -> Result<String, AssistantError> {
        self.calls.lock().unwrap().push(transcript.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::upstream("no scripted reply left")))
    }
}

pub(crate) const RECORDING_ADDRESS: &str = "0x1111111111111111111111111111111111111111";

/// Wallet that records every facade call by name.
pub(crate) struct RecordingWallet {
    pub(crate) calls: Vec<&'static str>,
    pub(crate) fail_connect: Option<WalletError>,
    state: WalletSessionState,
    nonce: u64,
}

impl RecordingWallet {
    pub(crate) fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_connect: None,
            state: WalletSessionState::default(),
            nonce: 0,
        }
    }

    pub(crate) fn failing_connect(error: WalletError) -> Self {
        Self {
            fail_connect: Some(error),
            ..Self::new()
        }
    }
}

#[async_trait]
impl WalletFacade for RecordingWallet {
    async fn connect(&mut self) -> Result<Connection, WalletError> {
        self.calls.push("connect");
        if let Some(error) = self.fail_connect.clone() {
            return Err(error);
        }
        self.state.address = Some(RECORDING_ADDRESS.to_string());
        self.state.chain_id = Some(1);
        self.state.connected = true;
        Ok(Connection {
            address: RECORDING_ADDRESS.to_string(),
            chain_id: 1,
        })
    }

    async fn disconnect(&mut self) {
        self.calls.push("disconnect");
        self.state.address = None;
        self.state.chain_id = None;
        self.state.connected = false;
    }

    fn address(&self) -> Option<String> {
        // read-only accessor; not counted so "no wallet call" checks stay meaningful
        self.state.address.clone()
    }

    async fn balance(&self) -> Result<String, WalletError> {
        if !self.state.connected {
            return Err(WalletError::NotConnected);
        }
        Ok("1000".to_string())
    }

    async fn transfer(&mut self, to: &str, _amount: &str) -> Result<TxReceipt, WalletError> {
        self.calls.push("transfer");
        if !self.state.connected {
            return Err(WalletError::NotConnected);
        }
        self.nonce += 1;
        self.state.last_nonce = Some(self.nonce);
        Ok(TxReceipt {
            hash: format!("0xhash{}{}", self.nonce, to.get(2..6).unwrap_or_default()),
            nonce: self.nonce,
        })
    }

    fn state(&self) -> &WalletSessionState {
        &self.state
    }
}

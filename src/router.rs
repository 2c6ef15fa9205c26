//! Turns a validated command envelope into wallet effects and one display message.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::str::FromStr;

use crate::assistant::{AssistantSession, ChatModel, CommandEnvelope};
use crate::commands::{Command, CommandKind};
use crate::error::Error;
use crate::history::ConversationHistory;
use crate::message::{DisplayMessage, MessageIds, MessageStatus};
use crate::prompts::SystemNotice;
use crate::wallet::{WalletFacade, keys};

/// Block number reported until a chain data source is wired in.
pub const PLACEHOLDER_BLOCK_NUMBER: u64 = 2_456_134;

/// Everything a dispatch may touch, borrowed from the controller for one call.
pub struct RouterContext<'a, M, W> {
    pub history: &'a mut ConversationHistory,
    pub session: &'a mut AssistantSession<M>,
    pub wallet: &'a mut W,
    pub ids: &'a mut MessageIds,
    /// Whether a corrective notice may still be sent this turn
    pub may_reprompt: bool,
}

/// What came out of a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Show this to the user
    Display(DisplayMessage),
    /// The envelope was not actionable. A corrective notice went to the
    /// assistant and this is its answer, not yet dispatched.
    Reprompted(CommandEnvelope),
    /// Not actionable and the turn has no corrections left. Nothing was sent.
    Unhandled,
}

/// Outcome of a single command before it becomes a display message.
struct Effect {
    content: String,
    /// Text for the systemCommand history entry, if the effect is recorded
    record: Option<String>,
    status: Option<MessageStatus>,
    data: Map<String, Value>,
}

impl Effect {
    /// Performed and recorded verbatim.
    fn recorded(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            record: Some(content.clone()),
            content,
            status: Some(MessageStatus::Success),
            data: Map::new(),
        }
    }

    /// Shown only; the assistant already has it in history.
    fn shown(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            record: None,
            status: None,
            data: Map::new(),
        }
    }

    fn with_record(mut self, record: impl Into<String>) -> Self {
        self.record = Some(record.into());
        self
    }

    fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(data) = data {
            self.data = data;
        }
        self
    }
}

/// Dispatches assistant commands.
pub struct CommandRouter;

impl CommandRouter {
    pub async fn handle<M, W>(
        envelope: &CommandEnvelope,
        ctx: RouterContext<'_, M, W>,
    ) -> Result<Routed, Error>
    where
        M: ChatModel,
        W: WalletFacade,
    {
        let kind = match &envelope.command {
            Command::Known(kind) => *kind,
            Command::Unrecognized(tag) => {
                tracing::warn!(tag = %tag, "Unrecognized command");
                return reprompt(SystemNotice::InvalidCommand, ctx).await;
            }
        };
        tracing::debug!(command = kind.tag(), "Dispatching command");

        use CommandKind::*;
        let effect = match kind {
            WalletConnect => {
                let connection = ctx.wallet.connect().await?;
                Effect::recorded(format!("Wallet connected: {}", connection.address)).with_data(
                    json!({ "address": connection.address, "chainId": connection.chain_id }),
                )
            }
            WalletDisconnect => {
                ctx.wallet.disconnect().await;
                Effect::recorded("Wallet disconnected")
            }
            WalletCheck | WalletBalance => {
                let connection = ctx.wallet.connect().await?;
                let balance = ctx.wallet.balance().await?;
                let address = ctx.wallet.address().unwrap_or(connection.address);
                Effect::recorded(wallet_details(&address, &balance))
                    .with_data(json!({ "address": address, "balance": balance }))
            }
            WalletCreate => {
                let generated = keys::generate();
                Effect::recorded(format!(
                    "Smart Wallet created:\n{}\nprivate key is:\n{}",
                    generated.address, generated.private_key
                ))
                .with_record(format!("Smart Wallet created: {}", generated.address))
                .with_data(json!({ "address": generated.address }))
            }
            CurrentBlockOfNetwork => {
                Effect::recorded(format!("Current network block is {PLACEHOLDER_BLOCK_NUMBER}"))
                    .with_data(json!({ "blockNumber": PLACEHOLDER_BLOCK_NUMBER }))
            }
            MyContracts => Effect::recorded("Currently contract api is not working"),
            AuditContract => Effect::recorded(envelope.text.clone()),
            MyWalletList => {
                let connection = ctx.wallet.connect().await?;
                let address = ctx.wallet.address().unwrap_or(connection.address);
                Effect::recorded(format!("your wallets are: [{address}]"))
                    .with_data(json!({ "wallets": [address] }))
            }
            TxCreate => match NativeTransfer::from_data(&envelope.data) {
                Some(transfer) => {
                    if !ctx.wallet.state().connected {
                        ctx.wallet.connect().await?;
                    }
                    let receipt = ctx.wallet.transfer(&transfer.to, &transfer.amount).await?;
                    Effect::recorded(format!("Transaction submitted: {}", receipt.hash)).with_data(
                        json!({
                            "hash": receipt.hash,
                            "nonce": receipt.nonce,
                            "to": transfer.to,
                            "amount": transfer.amount,
                        }),
                    )
                }
                None => {
                    tracing::warn!("Transaction request without usable data");
                    return reprompt(SystemNotice::InsufficientTransactionData, ctx).await;
                }
            },
            NormalMsg | CommandKind::Error => Effect::shown(envelope.text.clone()),

            // declared to the assistant, no dashboard effect yet
            WalletImport | WalletBackup | WalletRecover | WalletBatch | ContractDeploy
            | ContractInteract | ContractVerify | ContractUpgrade | ContractGetAbi | TxSign
            | TxStatus | TxCancel | CheckTransaction | SecurityCheck | CodeValidate
            | SignatureCheck | NetworkStatus | ChainSwitch | RpcManage | GasTrack
            | BlockMonitor | BridgeMonitor | ChainSync | NetworkHealth => {
                tracing::debug!(command = kind.tag(), "No handler, passing text through");
                Effect::shown(envelope.text.clone())
            }
        };

        if let Some(record) = effect.record {
            ctx.history.push_system_command(record);
        }

        let mut message = DisplayMessage::ai(ctx.ids.next_id(), effect.content)
            .with_system_type(kind.tag())
            .with_system_data(effect.data);
        if let Some(status) = effect.status {
            message = message.with_status(status);
        }
        Ok(Routed::Display(message))
    }
}

async fn reprompt<M: ChatModel, W>(
    notice: SystemNotice,
    ctx: RouterContext<'_, M, W>,
) -> Result<Routed, Error> {
    if !ctx.may_reprompt {
        tracing::debug!(?notice, "No corrections left, leaving command unhandled");
        return Ok(Routed::Unhandled);
    }
    let corrected = ctx.session.send_notice(notice, ctx.history).await?;
    Ok(Routed::Reprompted(corrected))
}

fn wallet_details(address: &str, balance: &str) -> String {
    let balance = Decimal::from_str(balance.trim())
        .map(|value| format!("{:.4}", value.round_dp(4)))
        .unwrap_or_else(|_| balance.to_string());
    format!("🚀 **Wallet Details**:\n- **Address**: {address}\n- **Balance**: {balance} ETH")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionData {
    #[serde(default, alias = "transationType")]
    transaction_type: Option<String>,
    #[serde(default)]
    contract: Option<String>,
    #[serde(default, alias = "prams")]
    params: Vec<TransactionParam>,
}

#[derive(Debug, Deserialize)]
struct TransactionParam {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    number: Option<Value>,
}

/// A plain value transfer extracted from TX_CREATE data.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NativeTransfer {
    to: String,
    amount: String,
}

impl NativeTransfer {
    /// `None` for contract calls and incomplete payloads.
    fn from_data(data: &Map<String, Value>) -> Option<Self> {
        let parsed: TransactionData = serde_json::from_value(Value::Object(data.clone())).ok()?;

        let native = parsed
            .transaction_type
            .as_deref()
            .is_none_or(|kind| kind.eq_ignore_ascii_case("native"));
        let has_contract = parsed
            .contract
            .as_deref()
            .is_some_and(|contract| !contract.trim().is_empty());
        if !native || has_contract {
            return None;
        }

        let param = parsed.params.into_iter().next()?;
        let to = param.address?.trim().to_string();
        let amount = match param.number? {
            Value::String(amount) => amount.trim().to_string(),
            Value::Number(amount) => amount.to_string(),
            _ => return None,
        };
        if to.is_empty() || amount.is_empty() {
            return None;
        }
        Some(Self { to, amount })
    }
}

use serde_json::{Map, Value, json};
use strum::IntoEnumIterator;

use crate::commands::{CommandCategory, CommandKind};

/// Canned model turn that follows the preamble.
pub const ACKNOWLEDGMENT: &str = r#"{"type": "normal_msg", "msg": "Hello! How can I help you today?"}"#;

/// Instruction preamble sent as the first user turn of every session.
///
/// Built from the command vocabulary so the assistant and the router can
/// never disagree about which tags exist.
pub fn instruction_preamble() -> String {
    let mut groups = Map::new();
    for category in CommandCategory::iter() {
        let tags: Vec<Value> = CommandKind::in_category(category)
            .map(|kind| Value::from(kind.tag()))
            .collect();
        groups.insert(category.prompt_key().to_string(), Value::Array(tags));
    }

    let preamble = json!({
        "execution_guidelines": {
            "strict_protocols": "Adhere strictly to the outlined protocols and message formats. Ordinary questions the user asks can be answered directly with normal_msg.",
            "dynamic_resolution": {
                "automatic_command_resolution": "If the user's input does not directly match a command, interpret the intent and select the closest matching command.",
                "no_invalid_command": "Never reply with an 'invalid command' or 'unrecognized' error. Pick the closest matching command instead."
            },
            "message_format": {
                "json_response": "Reply with exactly one JSON object: {\"type\": <command>, \"msg\": \"<message for the user>\", \"data\": {<optional command parameters>}}. No prose outside the object."
            }
        },
        "system_message_types": Value::Object(groups),
        "interaction_protocol": {
            "system_commands": {
                "execute": "Use a command from system_message_types directly, for example {\"type\": \"WALLET_CONNECT\", \"msg\": \"Connecting your wallet...\"}",
                "user_interactions": "Use normal_msg for messages directed at the user.",
                "transactions": "For TX_CREATE put the transaction in data: {\"transactionType\": \"native\" or \"contract\", \"contract\": \"0x...\" or null, \"params\": [{\"address\": \"0x...\", \"number\": \"<amount>\"}]}"
            }
        },
        "application_context": {
            "description": "You operate inside a wallet dashboard. Dashboard functions run only when you reply with the matching system command; messages meant for the user use normal_msg."
        }
    });

    serde_json::to_string_pretty(&preamble).unwrap_or_else(|_| preamble.to_string())
}

/// Corrective messages the router sends back to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotice {
    /// The reply used a tag outside the vocabulary
    InvalidCommand,
    /// TX_CREATE arrived without a usable transaction payload
    InsufficientTransactionData,
}

impl SystemNotice {
    pub fn render(self) -> String {
        match self {
            SystemNotice::InvalidCommand => invalid_command_notice(),
            SystemNotice::InsufficientTransactionData => INSUFFICIENT_TX_NOTICE.to_string(),
        }
    }
}

fn invalid_command_notice() -> String {
    let available: Vec<String> = CommandKind::iter()
        .filter(|kind| kind.category() != CommandCategory::General)
        .map(|kind| format!("{{command:{} , msg:\"{}\"}}", kind.tag(), kind.description()))
        .collect();

    format!(
        "type:system {{success:false , msg:\"invalid command\" , data:{{availableCommands:[\n{}\n]}}}}",
        available.join(",\n")
    )
}

const INSUFFICIENT_TX_NOTICE: &str = r#"type:system {success:false , msg:"insufficient data complete data required ex {
contract:"0x.."|| null // null for native transaction
prams:[{
address:"0x..."
number:"1"
}]
transationType:native||contract
}" , }"#;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::UnrecognizedCommand;

/// Every command tag the assistant is told about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// General conversation, shown verbatim
    #[strum(to_string = "normal_msg")]
    NormalMsg,
    /// The assistant reporting a problem, shown verbatim
    Error,

    #[strum(to_string = "WALLET_CONNECT", serialize = "CONNECT_WALLET")]
    WalletConnect,
    WalletDisconnect,
    WalletCheck,
    WalletBalance,
    WalletCreate,
    WalletImport,
    WalletBackup,
    WalletRecover,
    WalletBatch,
    MyWalletList,

    ContractDeploy,
    ContractInteract,
    ContractVerify,
    ContractUpgrade,
    ContractGetAbi,
    MyContracts,

    TxCreate,
    TxSign,
    TxStatus,
    TxCancel,
    CheckTransaction,

    SecurityCheck,
    CodeValidate,
    SignatureCheck,
    AuditContract,

    NetworkStatus,
    ChainSwitch,
    RpcManage,
    GasTrack,
    BlockMonitor,
    BridgeMonitor,
    ChainSync,
    NetworkHealth,
    CurrentBlockOfNetwork,
}

/// Grouping used when the vocabulary is described to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CommandCategory {
    General,
    Wallet,
    Contract,
    Transaction,
    Security,
    Network,
}

impl CommandCategory {
    /// Key used for this group in the instruction preamble.
    pub fn prompt_key(self) -> &'static str {
        match self {
            CommandCategory::General => "normal_msg",
            CommandCategory::Wallet => "wallet_operations",
            CommandCategory::Contract => "contract_operations",
            CommandCategory::Transaction => "transaction_operations",
            CommandCategory::Security => "security_operations",
            CommandCategory::Network => "network_operations",
        }
    }
}

impl CommandKind {
    /// Canonical wire tag.
    pub fn tag(self) -> &'static str {
        self.into()
    }

    /// Short description, shown to the assistant when it needs a reminder.
    pub fn description(self) -> &'static str {
        match self {
            CommandKind::NormalMsg => "to talk to the user",
            CommandKind::Error => "to report a problem to the user",
            CommandKind::WalletConnect => "to connect the wallet",
            CommandKind::WalletDisconnect => "to disconnect the wallet",
            CommandKind::WalletCheck => "to show wallet details",
            CommandKind::WalletBalance => "to check wallet balance",
            CommandKind::WalletCreate => "to create a wallet",
            CommandKind::WalletImport => "to import a wallet",
            CommandKind::WalletBackup => "to backup a wallet",
            CommandKind::WalletRecover => "to recover a wallet",
            CommandKind::WalletBatch => "to execute batch transactions",
            CommandKind::MyWalletList => "to list the user's wallets",
            CommandKind::ContractDeploy => "to deploy a contract",
            CommandKind::ContractInteract => "to interact with a contract",
            CommandKind::ContractVerify => "to verify a contract",
            CommandKind::ContractUpgrade => "to upgrade a contract",
            CommandKind::ContractGetAbi => "to fetch a contract ABI",
            CommandKind::MyContracts => "to list the user's contracts",
            CommandKind::TxCreate => "to create a transaction",
            CommandKind::TxSign => "to sign a transaction",
            CommandKind::TxStatus => "to check transaction status",
            CommandKind::TxCancel => "to cancel a transaction",
            CommandKind::CheckTransaction => "to look up a transaction",
            CommandKind::SecurityCheck => "to perform a security check",
            CommandKind::CodeValidate => "to validate contract code",
            CommandKind::SignatureCheck => "to check transaction signature",
            CommandKind::AuditContract => "to audit a contract",
            CommandKind::NetworkStatus => "to check network status",
            CommandKind::ChainSwitch => "to switch network chain",
            CommandKind::RpcManage => "to manage RPC settings",
            CommandKind::GasTrack => "to track gas prices",
            CommandKind::BlockMonitor => "to monitor new blocks",
            CommandKind::BridgeMonitor => "to monitor bridge transfers",
            CommandKind::ChainSync => "to check chain sync progress",
            CommandKind::NetworkHealth => "to check network health",
            CommandKind::CurrentBlockOfNetwork => "to get the current block number",
        }
    }

    pub fn category(self) -> CommandCategory {
        use CommandKind::*;
        match self {
            NormalMsg | Error => CommandCategory::General,
            WalletConnect | WalletDisconnect | WalletCheck | WalletBalance | WalletCreate
            | WalletImport | WalletBackup | WalletRecover | WalletBatch | MyWalletList => {
                CommandCategory::Wallet
            }
            ContractDeploy | ContractInteract | ContractVerify | ContractUpgrade
            | ContractGetAbi | MyContracts => CommandCategory::Contract,
            TxCreate | TxSign | TxStatus | TxCancel | CheckTransaction => {
                CommandCategory::Transaction
            }
            SecurityCheck | CodeValidate | SignatureCheck | AuditContract => {
                CommandCategory::Security
            }
            NetworkStatus | ChainSwitch | RpcManage | GasTrack | BlockMonitor | BridgeMonitor
            | ChainSync | NetworkHealth | CurrentBlockOfNetwork => CommandCategory::Network,
        }
    }

    /// Whether the router performs a dedicated effect for this command.
    pub fn is_wired(self) -> bool {
        use CommandKind::*;
        matches!(
            self,
            NormalMsg
                | Error
                | WalletConnect
                | WalletDisconnect
                | WalletCheck
                | WalletBalance
                | WalletCreate
                | MyWalletList
                | MyContracts
                | TxCreate
                | AuditContract
                | CurrentBlockOfNetwork
        )
    }

    /// Strict parse of a wire tag. Surrounding whitespace is ignored, case is not.
    pub fn parse_tag(tag: &str) -> Result<Self, UnrecognizedCommand> {
        CommandKind::from_str(tag.trim()).map_err(|_| UnrecognizedCommand(tag.to_string()))
    }

    pub fn in_category(category: CommandCategory) -> impl Iterator<Item = CommandKind> {
        CommandKind::iter().filter(move |kind| kind.category() == category)
    }
}

/// A command resolved from an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Known(CommandKind),
    /// Tag outside the vocabulary; answered with a corrective re-prompt.
    Unrecognized(String),
}

impl Command {
    pub fn from_tag(tag: &str) -> Self {
        match CommandKind::parse_tag(tag) {
            Ok(kind) => Command::Known(kind),
            Err(UnrecognizedCommand(tag)) => Command::Unrecognized(tag),
        }
    }

    /// Wire tag, as received for unrecognized commands.
    pub fn tag(&self) -> &str {
        match self {
            Command::Known(kind) => kind.tag(),
            Command::Unrecognized(tag) => tag,
        }
    }

    pub fn kind(&self) -> Option<CommandKind> {
        match self {
            Command::Known(kind) => Some(*kind),
            Command::Unrecognized(_) => None,
        }
    }
}

impl From<CommandKind> for Command {
    fn from(kind: CommandKind) -> Self {
        Command::Known(kind)
    }
}

impl Serialize for Command {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Command::from_tag(&tag))
    }
}

/// One line of the vocabulary listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub kind: CommandKind,
    pub tag: &'static str,
    pub description: &'static str,
}

pub fn command_entries() -> Vec<CommandEntry> {
    CommandKind::iter()
        .map(|kind| CommandEntry {
            kind,
            tag: kind.tag(),
            description: kind.description(),
        })
        .collect()
}

/// Human readable listing for the `commands` subcommand.
pub fn get_help_text() -> String {
    let mut help = String::from("Commands the assistant can issue:\n");
    for category in CommandCategory::iter() {
        help.push_str(&format!("\n[{}]\n", category.as_ref()));
        for kind in CommandKind::in_category(category) {
            let marker = if kind.is_wired() { "" } else { " (accepted, no action)" };
            help.push_str(&format!("  {} - {}{}\n", kind.tag(), kind.description(), marker));
        }
    }
    help.push_str("\nCONNECT_WALLET is accepted as an alias for WALLET_CONNECT.");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_canonical_tag() {
        for kind in CommandKind::iter() {
            assert_eq!(CommandKind::parse_tag(kind.tag()), Ok(kind));
        }
    }

    #[test]
    fn vocabulary_has_thirty_six_kinds() {
        // 37 wire tags, CONNECT_WALLET being an alias
        assert_eq!(CommandKind::iter().count(), 36);
    }

    #[test]
    fn connect_wallet_alias_maps_to_wallet_connect() {
        assert_eq!(Command::from_tag("CONNECT_WALLET"), Command::Known(CommandKind::WalletConnect));
        assert_eq!(CommandKind::WalletConnect.tag(), "WALLET_CONNECT");
    }

    #[test]
    fn normal_msg_keeps_lowercase_tag() {
        assert_eq!(CommandKind::NormalMsg.tag(), "normal_msg");
        assert_eq!(Command::from_tag("normal_msg"), Command::Known(CommandKind::NormalMsg));
        assert_eq!(Command::from_tag("NORMAL_MSG"), Command::Unrecognized("NORMAL_MSG".into()));
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let command = Command::from_tag("FOO_BAR");
        assert_eq!(command, Command::Unrecognized("FOO_BAR".to_string()));
        assert_eq!(command.tag(), "FOO_BAR");
        assert!(command.kind().is_none());
    }

    #[test]
    fn strict_parse_rejects_unknown_tag() {
        assert_eq!(
            CommandKind::parse_tag("FOO_BAR"),
            Err(UnrecognizedCommand("FOO_BAR".to_string()))
        );
        assert_eq!(CommandKind::parse_tag("TX_CREATE"), Ok(CommandKind::TxCreate));
    }

    #[test]
    fn whitespace_around_tag_is_ignored() {
        assert_eq!(Command::from_tag("  TX_CREATE \n"), Command::Known(CommandKind::TxCreate));
    }

    #[test]
    fn command_deserializes_from_tag_string() {
        let command: Command = serde_json::from_str("\"WALLET_BALANCE\"").unwrap();
        assert_eq!(command, Command::Known(CommandKind::WalletBalance));
        assert_eq!(serde_json::to_string(&command).unwrap(), "\"WALLET_BALANCE\"");
    }

    #[test]
    fn help_lists_unwired_commands_as_no_action() {
        let help = get_help_text();
        assert!(help.contains("WALLET_IMPORT - to import a wallet (accepted, no action)"));
        assert!(help.contains("WALLET_CONNECT - to connect the wallet\n"));
    }
}

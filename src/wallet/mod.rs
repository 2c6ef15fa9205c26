//! Wallet capability consumed by the command router.
//!
//! [`WalletFacade`] is the boundary the router talks to. [`WalletManager`]
//! implements it over any [`SigningProvider`], owning the session state and
//! enforcing the address and nonce guards on the signing path.

pub mod dev;
pub mod keys;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::WalletError;

pub use dev::DevProvider;
pub use keys::GeneratedWallet;

static ACCOUNT_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("address pattern is valid"));

/// Whether `address` is a well-formed `0x` account address.
pub fn is_valid_address(address: &str) -> bool {
    ACCOUNT_ADDRESS.is_match(address)
}

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub address: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
    pub nonce: u64,
}

/// Everything a provider needs to submit a value transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub value: String,
    pub nonce: u64,
    pub chain_id: u64,
}

/// Connection state owned by a wallet facade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSessionState {
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    pub last_nonce: Option<u64>,
    pub connected: bool,
}

#[async_trait]
pub trait WalletFacade: Send {
    async fn connect(&mut self) -> Result<Connection, WalletError>;

    /// Never fails; disconnecting twice is a no-op.
    async fn disconnect(&mut self);

    fn address(&self) -> Option<String>;

    /// Balance of the connected account as a decimal string.
    async fn balance(&self) -> Result<String, WalletError>;

    async fn transfer(&mut self, to: &str, amount: &str) -> Result<TxReceipt, WalletError>;

    fn state(&self) -> &WalletSessionState;
}

/// Signing/connection backend, e.g. an injected browser wallet.
#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Ask the user for account access; the first account is the active one.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn balance(&self, address: &str) -> Result<String, WalletError>;

    /// Next nonce for `address`.
    async fn transaction_count(&self, address: &str) -> Result<u64, WalletError>;

    /// Sign and submit; returns the transaction hash.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<String, WalletError>;
}

/// [`WalletFacade`] over an optional signing provider.
pub struct WalletManager<P> {
    provider: Option<P>,
    state: WalletSessionState,
}

impl<P: SigningProvider> WalletManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Some(provider),
            state: WalletSessionState::default(),
        }
    }

    /// A manager with nothing to sign with; every connect fails with `NoProvider`.
    pub fn without_provider() -> Self {
        Self {
            provider: None,
            state: WalletSessionState::default(),
        }
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected
    }

    /// The provider switched networks. Everything is invalidated and a reconnect is required.
    pub fn on_chain_changed(&mut self, chain_id: u64) {
        tracing::info!(chain_id, "Chain changed, wallet session invalidated");
        self.state = WalletSessionState::default();
    }

    /// The provider's account list changed.
    pub fn on_accounts_changed(&mut self, accounts: &[String]) {
        match accounts.first() {
            None => self.clear_connection(),
            Some(first) => {
                if self.state.connected && self.state.address.as_deref() != Some(first.as_str()) {
                    tracing::info!(address = %first, "Active account changed");
                    self.state.address = Some(first.clone());
                }
            }
        }
    }

    fn clear_connection(&mut self) {
        self.state.address = None;
        self.state.chain_id = None;
        self.state.connected = false;
    }

    fn connected_provider(&self) -> Result<(&P, &str), WalletError> {
        match (&self.provider, self.state.address.as_deref()) {
            (Some(provider), Some(address)) if self.state.connected => Ok((provider, address)),
            _ => Err(WalletError::NotConnected),
        }
    }
}

fn validate_amount(amount: &str) -> Result<(), WalletError> {
    match Decimal::from_str(amount.trim()) {
        Ok(value) if value > Decimal::ZERO => Ok(()),
        _ => Err(WalletError::InvalidAmount(amount.to_string())),
    }
}

#[async_trait]
impl<P: SigningProvider> WalletFacade for WalletManager<P> {
    async fn connect(&mut self) -> Result<Connection, WalletError> {
        let provider = self.provider.as_ref().ok_or(WalletError::NoProvider)?;

        let accounts = provider.request_accounts().await?;
        let address = accounts
            .into_iter()
            .next()
            .ok_or_else(|| WalletError::Provider("provider returned no accounts".to_string()))?;
        let chain_id = provider.chain_id().await?;

        self.state.address = Some(address.clone());
        self.state.chain_id = Some(chain_id);
        self.state.connected = true;

        tracing::info!(%address, chain_id, "Wallet connected");
        Ok(Connection { address, chain_id })
    }

    async fn disconnect(&mut self) {
        if self.state.connected {
            tracing::info!("Wallet disconnected");
        }
        self.clear_connection();
    }

    fn address(&self) -> Option<String> {
        self.state.address.clone()
    }

    async fn balance(&self) -> Result<String, WalletError> {
        let (provider, address) = self.connected_provider()?;
        provider.balance(address).await
    }

    async fn transfer(&mut self, to: &str, amount: &str) -> Result<TxReceipt, WalletError> {
        let provider = match (&self.provider, self.state.connected) {
            (Some(provider), true) => provider,
            _ => return Err(WalletError::NotConnected),
        };
        let from = self.state.address.clone().ok_or(WalletError::NotConnected)?;

        if !is_valid_address(to) {
            return Err(WalletError::InvalidAddress(to.to_string()));
        }
        validate_amount(amount)?;

        let nonce = provider.transaction_count(&from).await?;
        if let Some(last) = self.state.last_nonce {
            if nonce <= last {
                tracing::warn!(next = nonce, last, "Rejected non-increasing nonce");
                return Err(WalletError::Nonce { next: nonce, last });
            }
        }

        let request = TransactionRequest {
            from,
            to: to.to_string(),
            value: amount.trim().to_string(),
            nonce,
            chain_id: self.state.chain_id.unwrap_or_default(),
        };

        // a nonce only counts as used once the provider accepts it
        let hash = provider.send_transaction(request).await?;
        self.state.last_nonce = Some(nonce);
        tracing::info!(%hash, nonce, "Transfer submitted");
        Ok(TxReceipt { hash, nonce })
    }

    fn state(&self) -> &WalletSessionState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU64, Ordering};

    const RECIPIENT: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn dev_manager() -> WalletManager<DevProvider> {
        WalletManager::new(DevProvider::random(1, "1000"))
    }

    /// Reports the same nonce forever, like a node that has not seen the last tx yet.
    struct StaleNonceProvider {
        sent: AtomicU64,
    }

    #[async_trait]
    impl SigningProvider for StaleNonceProvider {
        async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
            Ok(vec!["0x1111111111111111111111111111111111111111".to_string()])
        }

        async fn chain_id(&self) -> Result<u64, WalletError> {
            Ok(5)
        }

        async fn balance(&self, _address: &str) -> Result<String, WalletError> {
            Ok("0".to_string())
        }

        async fn transaction_count(&self, _address: &str) -> Result<u64, WalletError> {
            Ok(7)
        }

        async fn send_transaction(&self, request: TransactionRequest) -> Result<String, WalletError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(format!("0xstale{}", request.nonce))
        }
    }

    /// Fails the first submission, then behaves like a node that counts sent txs.
    struct FlakyProvider {
        sent: AtomicU64,
        failures_left: AtomicU64,
    }

    #[async_trait]
    impl SigningProvider for FlakyProvider {
        async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
            Ok(vec!["0x1111111111111111111111111111111111111111".to_string()])
        }

        async fn chain_id(&self) -> Result<u64, WalletError> {
            Ok(1)
        }

        async fn balance(&self, _address: &str) -> Result<String, WalletError> {
            Ok("0".to_string())
        }

        async fn transaction_count(&self, _address: &str) -> Result<u64, WalletError> {
            Ok(self.sent.load(Ordering::SeqCst))
        }

        async fn send_transaction(&self, request: TransactionRequest) -> Result<String, WalletError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(WalletError::Provider("rpc hiccup".to_string()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(format!("0xflaky{}", request.nonce))
        }
    }

    #[tokio::test]
    async fn connect_populates_state() {
        let mut wallet = dev_manager();
        let connection = wallet.connect().await.unwrap();

        assert!(wallet.is_connected());
        assert_eq!(wallet.address(), Some(connection.address.clone()));
        assert_eq!(wallet.state().chain_id, Some(1));
        assert!(is_valid_address(&connection.address));
    }

    #[tokio::test]
    async fn connect_without_provider_fails() {
        let mut wallet = WalletManager::<DevProvider>::without_provider();
        assert_eq!(wallet.connect().await, Err(WalletError::NoProvider));
        assert_eq!(wallet.state(), &WalletSessionState::default());
    }

    #[tokio::test]
    async fn rejected_connection_leaves_state_empty() {
        let mut wallet = WalletManager::new(DevProvider::random(1, "1000").rejecting());
        assert_eq!(wallet.connect().await, Err(WalletError::UserRejected));
        assert!(!wallet.is_connected());
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut wallet = dev_manager();
        wallet.disconnect().await;
        let before = wallet.state().clone();
        wallet.disconnect().await;
        assert_eq!(wallet.state(), &before);
        assert_eq!(before, WalletSessionState::default());
    }

    #[tokio::test]
    async fn disconnect_clears_connection() {
        let mut wallet = dev_manager();
        wallet.connect().await.unwrap();
        wallet.disconnect().await;

        assert!(!wallet.is_connected());
        assert_eq!(wallet.address(), None);
        assert_eq!(wallet.balance().await, Err(WalletError::NotConnected));
    }

    #[tokio::test]
    async fn balance_comes_from_provider() {
        let mut wallet = dev_manager();
        wallet.connect().await.unwrap();
        assert_eq!(wallet.balance().await.unwrap(), "1000");
    }

    #[tokio::test]
    async fn sequential_transfers_use_increasing_nonces() {
        let mut wallet = dev_manager();
        wallet.connect().await.unwrap();

        let first = wallet.transfer(RECIPIENT, "0.5").await.unwrap();
        let second = wallet.transfer(RECIPIENT, "0.25").await.unwrap();

        assert!(second.nonce > first.nonce);
        assert_ne!(first.hash, second.hash);
        assert_eq!(wallet.state().last_nonce, Some(second.nonce));
    }

    #[tokio::test]
    async fn stale_nonce_is_rejected() {
        let provider = StaleNonceProvider {
            sent: AtomicU64::new(0),
        };
        let mut wallet = WalletManager::new(provider);
        wallet.connect().await.unwrap();

        wallet.transfer(RECIPIENT, "1").await.unwrap();
        let result = wallet.transfer(RECIPIENT, "1").await;

        assert_eq!(result, Err(WalletError::Nonce { next: 7, last: 7 }));
        assert_eq!(wallet.provider().unwrap().sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_submission_does_not_consume_the_nonce() {
        let mut wallet = WalletManager::new(FlakyProvider {
            sent: AtomicU64::new(0),
            failures_left: AtomicU64::new(1),
        });
        wallet.connect().await.unwrap();

        assert_eq!(
            wallet.transfer(RECIPIENT, "1").await,
            Err(WalletError::Provider("rpc hiccup".to_string()))
        );
        assert_eq!(wallet.state().last_nonce, None);

        let retried = wallet.transfer(RECIPIENT, "1").await.unwrap();
        assert_eq!(retried.nonce, 0);
        let next = wallet.transfer(RECIPIENT, "1").await.unwrap();
        assert_eq!(next.nonce, 1);
        assert_eq!(wallet.state().last_nonce, Some(1));
    }

    #[tokio::test]
    async fn transfer_validates_recipient_and_amount() {
        let mut wallet = dev_manager();
        wallet.connect().await.unwrap();

        assert_eq!(
            wallet.transfer("0x1234", "1").await,
            Err(WalletError::InvalidAddress("0x1234".to_string()))
        );
        assert_eq!(
            wallet.transfer(RECIPIENT, "-3").await,
            Err(WalletError::InvalidAmount("-3".to_string()))
        );
        assert_eq!(
            wallet.transfer(RECIPIENT, "lots").await,
            Err(WalletError::InvalidAmount("lots".to_string()))
        );
        assert_eq!(wallet.state().last_nonce, None);
    }

    #[tokio::test]
    async fn transfer_requires_connection() {
        let mut wallet = dev_manager();
        assert_eq!(
            wallet.transfer(RECIPIENT, "1").await,
            Err(WalletError::NotConnected)
        );
    }

    #[tokio::test]
    async fn chain_change_invalidates_session() {
        let mut wallet = dev_manager();
        wallet.connect().await.unwrap();
        wallet.transfer(RECIPIENT, "1").await.unwrap();

        wallet.on_chain_changed(137);

        assert_eq!(wallet.state(), &WalletSessionState::default());
        assert_eq!(
            wallet.transfer(RECIPIENT, "1").await,
            Err(WalletError::NotConnected)
        );
    }

    #[tokio::test]
    async fn accounts_changed_switches_or_disconnects() {
        let mut wallet = dev_manager();
        wallet.connect().await.unwrap();

        let other = "0x3333333333333333333333333333333333333333".to_string();
        wallet.on_accounts_changed(&[other.clone()]);
        assert_eq!(wallet.address(), Some(other));

        wallet.on_accounts_changed(&[]);
        assert!(!wallet.is_connected());
        assert_eq!(wallet.address(), None);
    }

    #[test]
    fn address_pattern() {
        assert!(is_valid_address(RECIPIENT));
        assert!(!is_valid_address("2c7536E3605D9C16a7a3D7b1898e529396a65c23"));
        assert!(!is_valid_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c2"));
        assert!(!is_valid_address("0xZZ7536E3605D9C16a7a3D7b1898e529396a65c23"));
    }
}

use async_trait::async_trait;
use k256::ecdsa::signature::Signer;
use k256::ecdsa::{Signature, SigningKey};
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};
use std::sync::atomic::{AtomicU64, Ordering};

use super::keys;
use super::{SigningProvider, TransactionRequest};
use crate::error::WalletError;

/// In-memory signing provider holding a single local account.
///
/// Nothing is broadcast. Transactions are signed with the local key and
/// identified by a Keccak-256 hash over the payload and signature. The
/// reported balance is whatever it was configured with.
pub struct DevProvider {
    key: SigningKey,
    address: String,
    chain_id: u64,
    balance: String,
    sent: AtomicU64,
    rejecting: bool,
}

impl DevProvider {
    pub fn random(chain_id: u64, balance: impl Into<String>) -> Self {
        Self::with_key(SigningKey::random(&mut OsRng), chain_id, balance)
    }

    pub fn from_private_key(
        private_key: &str,
        chain_id: u64,
        balance: impl Into<String>,
    ) -> Result<Self, WalletError> {
        Ok(Self::with_key(
            keys::signing_key_from_hex(private_key)?,
            chain_id,
            balance,
        ))
    }

    fn with_key(key: SigningKey, chain_id: u64, balance: impl Into<String>) -> Self {
        let address = keys::checksum_address(&keys::address_of(key.verifying_key()));
        Self {
            key,
            address,
            chain_id,
            balance: balance.into(),
            sent: AtomicU64::new(0),
            rejecting: false,
        }
    }

    /// Decline every account request, as a user dismissing the prompt would.
    pub fn rejecting(mut self) -> Self {
        self.rejecting = true;
        self
    }

    pub fn account(&self) -> &str {
        &self.address
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SigningProvider for DevProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        if self.rejecting {
            return Err(WalletError::UserRejected);
        }
        Ok(vec![self.address.clone()])
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id)
    }

    async fn balance(&self, address: &str) -> Result<String, WalletError> {
        if !address.eq_ignore_ascii_case(&self.address) {
            return Err(WalletError::Provider(format!("unknown account {address}")));
        }
        Ok(self.balance.clone())
    }

    async fn transaction_count(&self, _address: &str) -> Result<u64, WalletError> {
        Ok(self.sent.load(Ordering::SeqCst))
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<String, WalletError> {
        if !request.from.eq_ignore_ascii_case(&self.address) {
            return Err(WalletError::Provider(format!(
                "cannot sign for {}",
                request.from
            )));
        }
        let expected = self.sent.load(Ordering::SeqCst);
        if request.nonce != expected {
            return Err(WalletError::Provider(format!(
                "nonce {} does not match account nonce {expected}",
                request.nonce
            )));
        }

        let payload = format!(
            "{}:{}:{}:{}:{}",
            request.chain_id,
            request.from.to_ascii_lowercase(),
            request.to.to_ascii_lowercase(),
            request.value,
            request.nonce
        );
        let signature: Signature = self.key.sign(payload.as_bytes());

        let mut hasher = Keccak256::new();
        hasher.update(payload.as_bytes());
        hasher.update(signature.to_bytes());
        let hash = format!("0x{}", hex::encode(hasher.finalize()));

        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(hash)
    }
}

//! Local secp256k1 key generation and Ethereum address derivation.

use ethers::types::Address;
use ethers::utils::to_checksum;
use k256::PublicKey;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};

use crate::error::WalletError;

/// A freshly generated account. Nothing about it touches a chain.
#[derive(Debug, Clone)]
pub struct GeneratedWallet {
    pub address: String,
    pub private_key: String,
}

pub fn generate() -> GeneratedWallet {
    let key = SigningKey::random(&mut OsRng);
    GeneratedWallet {
        address: checksum_address(&address_of(key.verifying_key())),
        private_key: private_key_hex(&key),
    }
}

/// Last 20 bytes of Keccak-256 over the uncompressed point.
pub fn address_of(key: &VerifyingKey) -> Address {
    let public_key = PublicKey::from(key);
    let uncompressed = public_key.to_encoded_point(false);
    let digest = Keccak256::digest(&uncompressed.as_bytes()[1..]);
    Address::from_slice(&digest[12..32])
}

pub fn private_key_hex(key: &SigningKey) -> String {
    format!("0x{}", hex::encode(key.to_bytes()))
}

pub fn signing_key_from_hex(raw: &str) -> Result<SigningKey, WalletError> {
    let trimmed = raw.trim();
    let without_prefix = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(without_prefix)
        .map_err(|error| WalletError::Provider(format!("private key is not valid hex: {error}")))?;
    if bytes.len() != 32 {
        return Err(WalletError::Provider(
            "private key must be exactly 32 bytes".to_string(),
        ));
    }
    SigningKey::from_slice(&bytes)
        .map_err(|error| WalletError::Provider(format!("invalid private key: {error}")))
}

/// EIP-55 mixed-case form of an address.
pub fn checksum_address(address: &Address) -> String {
    to_checksum(address, None)
}

//! Signing key for registration and mint transactions.
//!
//! # Security
//! - The key is read ONLY from `FRIENDFI_PRIVATE_KEY`
//! - The key is never logged, serialized or printed by `Debug`

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable carrying the hex-encoded private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "FRIENDFI_PRIVATE_KEY";

/// A local signer bound to one chain (EIP-155).
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Parse a hex key, with or without `0x`, surrounding whitespace ignored.
    pub fn from_private_key(key: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let signer = key
            .parse::<PrivateKeySigner>()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?
            .with_chain_id(Some(chain_id));

        tracing::debug!(address = %signer.address(), chain_id, "Signing key loaded");
        Ok(Self { signer })
    }

    /// Load the key from [`PRIVATE_KEY_ENV_VAR`]. An empty value counts as unset.
    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        match std::env::var(PRIVATE_KEY_ENV_VAR) {
            Ok(key) if !key.trim().is_empty() => Self::from_private_key(&key, chain_id),
            _ => Err(BlockchainError::Wallet(format!("{} is not set", PRIVATE_KEY_ENV_VAR))),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.signer.chain_id().unwrap_or_default()
    }

    /// Signer for a wallet-filling provider.
    pub fn signer(&self) -> PrivateKeySigner {
        self.signer.clone()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id())
            .finish()
    }
}

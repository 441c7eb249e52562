//! Mint event types.

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// A FriendKey mint observed on chain (`TransferBatch` from the zero address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintEvent {
    /// Tier level of the emitting FriendKey contract.
    pub level: u8,
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    /// Token ids minted.
    pub ids: Vec<U256>,
    /// Amount minted per id, aligned with `ids`.
    pub values: Vec<U256>,
    pub tx_hash: Option<TxHash>,
    pub block_number: Option<u64>,
}

impl MintEvent {
    /// Total number of keys minted across all ids.
    pub fn total_amount(&self) -> U256 {
        self.values.iter().fold(U256::ZERO, |acc, v| acc.saturating_add(*v))
    }
}

//! Errors and shared types for chain access.

use serde::Serialize;
use thiserror::Error;

// RPC settings live with the rest of the file configuration.
pub use crate::config::schema::BlockchainConfig;

/// Failures talking to the chain.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Transport error or node-side rejection.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Every endpoint timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Return data did not match the expected ABI.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Transaction not confirmed within {0} blocks")]
    ConfirmationTimeout(u32),

    /// Missing or malformed signing key.
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// The node serves a different chain than configured.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Final state of a watched transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Mined successfully and buried under the configured number of blocks.
    Confirmed { block_number: u64 },
    /// Mined but reverted.
    Failed { reason: String },
}

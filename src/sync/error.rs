//! Errors surfaced by the sync client.
//!
//! Read-path failures (`ContextIncomplete`, `Fetch`) are logged and swallowed
//! by [`AccountSyncClient::sync`](crate::sync::AccountSyncClient::sync).
//! Write-path failures always reach the caller.

use alloy::primitives::U256;
use thiserror::Error;

use crate::blockchain::{BlockchainError, ContractKind};

#[derive(Debug, Error)]
pub enum SyncError {
    /// A field a refresh needs is absent. Never surfaced by `sync`.
    #[error("session context incomplete: missing {missing}")]
    ContextIncomplete { missing: &'static str },

    /// A field a write needs is absent.
    #[error("invalid session context: missing {0}")]
    InvalidContext(&'static str),

    #[error("no wallet address in session")]
    MissingAddress,

    #[error("mint amount must be positive")]
    InvalidAmount,

    #[error("no {kind} contract configured for chain {chain_id}")]
    UnknownContract { chain_id: u64, kind: ContractKind },

    #[error("state fetch failed: {0}")]
    Fetch(#[source] BlockchainError),

    #[error("mint fee query failed: {0}")]
    FeeQuery(#[source] BlockchainError),

    #[error("mint fee {fee} wei exceeds limit {limit} wei")]
    FeeAboveLimit { fee: U256, limit: U256 },

    #[error("transaction submission failed: {0}")]
    Submission(#[source] BlockchainError),
}

pub type SyncResult<T> = Result<T, SyncError>;

//! Registration and batch-mint submission.
//!
//! Both operations return as soon as the transaction is accepted by the
//! node. Receipts, confirmations and reorgs are the caller's concern.

use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;

use crate::blockchain::contracts::{FriendKeyManager, UserManager};
use crate::blockchain::{ContractCaller, ContractKind, ContractRegistry, TransactionSender};
use crate::observability::metrics;
use crate::sync::context::SessionContext;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::fetcher::{quote_mint_fee, resolve};

const WEI_PER_GWEI: u64 = 1_000_000_000;

/// Which write produced a [`SubmittedTx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Register,
    BatchMint,
}

impl TxKind {
    fn label(self) -> &'static str {
        match self {
            TxKind::Register => "register",
            TxKind::BatchMint => "batch_mint",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Handle for a broadcast, not yet confirmed, transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedTx {
    pub kind: TxKind,
    pub to: Address,
    pub value: U256,
    pub tx_hash: TxHash,
}

/// Builds and submits the two write transactions.
pub struct TransactionSubmitter<C, S> {
    caller: Arc<C>,
    sender: Arc<S>,
    contracts: Arc<ContractRegistry>,
    max_mint_fee: Option<U256>,
}

impl<C: ContractCaller, S: TransactionSender> TransactionSubmitter<C, S> {
    pub fn new(caller: Arc<C>, sender: Arc<S>, contracts: Arc<ContractRegistry>) -> Self {
        Self {
            caller,
            sender,
            contracts,
            max_mint_fee: None,
        }
    }

    /// Refuse mints whose quoted fee is above `gwei`.
    pub fn with_max_mint_fee_gwei(mut self, gwei: Option<u64>) -> Self {
        self.max_mint_fee = gwei.map(|g| U256::from(g) * U256::from(WEI_PER_GWEI));
        self
    }

    /// Submit `register(identity, authToken)` to the UserManager.
    pub async fn register(&self, context: &SessionContext) -> SyncResult<SubmittedTx> {
        let identity = context.identity().ok_or(SyncError::InvalidContext("identity"))?;
        let token = context.auth_token().ok_or(SyncError::InvalidContext("auth_token"))?;
        let chain_id = context.chain_id.ok_or(SyncError::InvalidContext("chain_id"))?;

        let to = resolve(&self.contracts, chain_id, ContractKind::UserManager)?;
        let data = UserManager::registerCall {
            uuid: identity.to_string(),
            token: token.to_string(),
        }
        .abi_encode();

        self.submit(TxKind::Register, to, Bytes::from(data), None).await
    }

    /// Submit `batchMint(wallet, amount)` paying the fee quoted just before sending.
    ///
    /// The fee can change between the quote and inclusion; set a fee cap with
    /// [`with_max_mint_fee_gwei`](Self::with_max_mint_fee_gwei) to bound it.
    pub async fn batch_mint(&self, context: &SessionContext, amount: u64) -> SyncResult<SubmittedTx> {
        if amount == 0 {
            return Err(SyncError::InvalidAmount);
        }
        let wallet = context.wallet_address.ok_or(SyncError::MissingAddress)?;
        let chain_id = context.chain_id.ok_or(SyncError::InvalidContext("chain_id"))?;
        let manager = resolve(&self.contracts, chain_id, ContractKind::FriendKeyManager)?;

        let fee = quote_mint_fee(self.caller.as_ref(), manager, amount).await?;
        if let Some(limit) = self.max_mint_fee {
            if fee > limit {
                tracing::warn!(fee = %fee, limit = %limit, amount, "Mint fee above configured limit");
                return Err(SyncError::FeeAboveLimit { fee, limit });
            }
        }

        let data = FriendKeyManager::batchMintCall {
            to: wallet,
            amount: U256::from(amount),
        }
        .abi_encode();

        self.submit(TxKind::BatchMint, manager, Bytes::from(data), Some(fee)).await
    }

    async fn submit(&self, kind: TxKind, to: Address, data: Bytes, value: Option<U256>) -> SyncResult<SubmittedTx> {
        match self.sender.send(to, data, value).await {
            Ok(tx_hash) => {
                metrics::record_submission(kind.label(), true);
                tracing::info!(kind = %kind, tx_hash = %tx_hash, to = %to, "Transaction submitted");
                Ok(SubmittedTx {
                    kind,
                    to,
                    value: value.unwrap_or_default(),
                    tx_hash,
                })
            }
            Err(e) => {
                metrics::record_submission(kind.label(), false);
                tracing::error!(kind = %kind, to = %to, error = %e, "Transaction submission failed");
                Err(SyncError::Submission(e))
            }
        }
    }
}

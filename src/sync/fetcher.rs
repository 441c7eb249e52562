//! Batched read of the account state.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::blockchain::contracts::{FriendKeyManager, UserManager};
use crate::blockchain::{BlockchainError, ContractCaller, ContractKind, ContractRegistry, MulticallBatch};
use crate::sync::context::SessionContext;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::state::SyncedAccountState;

/// Read-only account queries: the synced state in one round trip, and mint fee quotes.
pub struct StateFetcher<C> {
    caller: Arc<C>,
    contracts: Arc<ContractRegistry>,
}

impl<C: ContractCaller> StateFetcher<C> {
    pub fn new(caller: Arc<C>, contracts: Arc<ContractRegistry>) -> Self {
        Self { caller, contracts }
    }

    /// Fetch the account state for `context`.
    ///
    /// An incomplete context fails with `ContextIncomplete` before any call is made.
    pub async fn fetch(&self, context: &SessionContext) -> SyncResult<SyncedAccountState> {
        let scope = context.read_scope()?;

        let user_manager = resolve(&self.contracts, scope.chain_id, ContractKind::UserManager)?;
        let multicall = resolve(&self.contracts, scope.chain_id, ContractKind::Multicall)?;

        let mut batch = MulticallBatch::new(multicall);
        let registered_idx = batch.add(
            user_manager,
            &UserManager::isRegisteredCall {
                uuid: scope.identity.to_string(),
            },
        );
        let account_idx = batch.add(
            user_manager,
            &UserManager::addressIdCall {
                account: scope.wallet,
            },
        );
        let users_idx = batch.add(user_manager, &UserManager::numUsersCall {});

        let results = batch.execute(self.caller.as_ref()).await.map_err(SyncError::Fetch)?;

        let is_registered = results
            .decode::<UserManager::isRegisteredCall>(registered_idx)
            .map_err(SyncError::Fetch)?;
        let nft_id = results
            .decode::<UserManager::addressIdCall>(account_idx)
            .and_then(|v| to_u64(v, "addressId"))
            .map_err(SyncError::Fetch)?;
        let num_users = results
            .decode::<UserManager::numUsersCall>(users_idx)
            .and_then(|v| to_u64(v, "numUsers"))
            .map_err(SyncError::Fetch)?;

        tracing::debug!(
            chain_id = scope.chain_id,
            wallet = %scope.wallet,
            is_registered,
            nft_id,
            num_users,
            "Account state fetched"
        );

        Ok(SyncedAccountState {
            is_registered,
            nft_id,
            num_users,
        })
    }

    /// Current fee, in wei, for minting `amount` keys. Needs only `chain_id`.
    pub async fn mint_fee(&self, context: &SessionContext, amount: u64) -> SyncResult<U256> {
        let chain_id = context.chain_id.ok_or(SyncError::InvalidContext("chain_id"))?;
        let manager = resolve(&self.contracts, chain_id, ContractKind::FriendKeyManager)?;
        quote_mint_fee(self.caller.as_ref(), manager, amount).await
    }
}

/// `getMintFee(amount)` on `manager`.
pub(crate) async fn quote_mint_fee<C: ContractCaller>(caller: &C, manager: Address, amount: u64) -> SyncResult<U256> {
    let data = FriendKeyManager::getMintFeeCall {
        amount: U256::from(amount),
    }
    .abi_encode();

    let raw = caller
        .call(manager, Bytes::from(data))
        .await
        .map_err(SyncError::FeeQuery)?;

    FriendKeyManager::getMintFeeCall::abi_decode_returns(&raw)
        .map_err(|e| SyncError::FeeQuery(BlockchainError::Decode(format!("getMintFee: {}", e))))
}

pub(crate) fn resolve(contracts: &ContractRegistry, chain_id: u64, kind: ContractKind) -> SyncResult<Address> {
    contracts
        .resolve(chain_id, kind)
        .ok_or(SyncError::UnknownContract { chain_id, kind })
}

fn to_u64(value: U256, what: &str) -> Result<u64, BlockchainError> {
    u64::try_from(value)
        .map_err(|_| BlockchainError::Decode(format!("{} value {} does not fit in u64", what, value)))
}

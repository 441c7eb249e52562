//! The account sync client.

use std::sync::Arc;

use alloy::primitives::U256;
use tokio::sync::{broadcast, watch};

use crate::blockchain::{ContractCaller, ContractRegistry, TransactionSender};
use crate::events::MintEvent;
use crate::observability::metrics;
use crate::sync::context::SessionContext;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::fetcher::StateFetcher;
use crate::sync::listeners::{ListenerHandle, ListenerRegistry};
use crate::sync::state::{RefreshOutcome, StateStore, SyncedAccountState};
use crate::sync::submitter::{SubmittedTx, TransactionSubmitter};

/// Keeps account state in sync with the chain and submits account transactions.
///
/// `C` performs read-only calls, `S` broadcasts transactions. Both are
/// injected so the client never owns a wallet session.
pub struct AccountSyncClient<C, S> {
    fetcher: StateFetcher<C>,
    submitter: TransactionSubmitter<C, S>,
    listeners: ListenerRegistry,
    state: StateStore,
}

impl<C, S> AccountSyncClient<C, S>
where
    C: ContractCaller,
    S: TransactionSender,
{
    pub fn new(caller: Arc<C>, sender: Arc<S>, contracts: Arc<ContractRegistry>) -> Self {
        Self {
            fetcher: StateFetcher::new(Arc::clone(&caller), Arc::clone(&contracts)),
            submitter: TransactionSubmitter::new(caller, sender, contracts),
            listeners: ListenerRegistry::new(),
            state: StateStore::new(),
        }
    }

    /// Refuse mints whose quoted fee is above `gwei`.
    pub fn with_max_mint_fee_gwei(mut self, gwei: Option<u64>) -> Self {
        self.submitter = self.submitter.with_max_mint_fee_gwei(gwei);
        self
    }

    /// Latest committed account state.
    pub fn state(&self) -> SyncedAccountState {
        self.state.get()
    }

    /// Receiver that wakes on every committed state change.
    pub fn watch_state(&self) -> watch::Receiver<SyncedAccountState> {
        self.state.subscribe()
    }

    /// Whether a refresh is in flight.
    pub fn is_fetching(&self) -> bool {
        self.state.is_fetching()
    }

    /// Fetch and commit account state for `context`.
    ///
    /// An incomplete context is skipped without any network call. Results of a
    /// refresh that started before an already committed one are discarded.
    pub async fn refresh(&self, context: &SessionContext) -> SyncResult<RefreshOutcome> {
        if let Err(SyncError::ContextIncomplete { missing }) = context.read_scope() {
            tracing::debug!(missing, "Session context incomplete, skipping refresh");
            metrics::record_refresh("skipped");
            return Ok(RefreshOutcome::Skipped { missing });
        }

        let ticket = self.state.begin();
        let fetched = match self.fetcher.fetch(context).await {
            Ok(state) => state,
            Err(e) => {
                metrics::record_refresh("failed");
                return Err(e);
            }
        };

        let outcome = if self.state.commit(&ticket, fetched) {
            tracing::info!(
                seq = ticket.seq(),
                is_registered = fetched.is_registered,
                nft_id = fetched.nft_id,
                num_users = fetched.num_users,
                "Account state updated"
            );
            RefreshOutcome::Updated(fetched)
        } else {
            tracing::debug!(seq = ticket.seq(), "Discarding superseded refresh");
            RefreshOutcome::Superseded
        };
        metrics::record_refresh(outcome.label());
        Ok(outcome)
    }

    /// Refresh, logging and swallowing any failure. Previous state is kept on error.
    pub async fn sync(&self, context: &SessionContext) {
        if let Err(e) = self.refresh(context).await {
            tracing::error!(error = %e, "Account state refresh failed, keeping previous state");
        }
    }

    /// Refresh on the current context and on every change until shutdown.
    ///
    /// Each refresh runs in its own task so a slow call never delays a newer
    /// context; fencing keeps the newest result.
    pub async fn follow_context(
        self: Arc<Self>,
        mut contexts: watch::Receiver<SessionContext>,
        mut shutdown: broadcast::Receiver<()>,
    ) where
        C: 'static,
        S: 'static,
    {
        loop {
            let context = contexts.borrow_and_update().clone();
            let client = Arc::clone(&self);
            tokio::spawn(async move { client.sync(&context).await });

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Context follower stopping");
                    break;
                }
                changed = contexts.changed() => {
                    if changed.is_err() {
                        tracing::info!("Session context source closed");
                        break;
                    }
                }
            }
        }
    }

    /// Submit the registration transaction.
    pub async fn register(&self, context: &SessionContext) -> SyncResult<SubmittedTx> {
        self.submitter.register(context).await
    }

    /// Submit a batch mint of `amount` keys to the session wallet.
    pub async fn batch_mint(&self, context: &SessionContext, amount: u64) -> SyncResult<SubmittedTx> {
        self.submitter.batch_mint(context, amount).await
    }

    /// Quote the current mint fee for `amount` keys, in wei.
    pub async fn mint_fee(&self, context: &SessionContext, amount: u64) -> SyncResult<U256> {
        self.fetcher.mint_fee(context, amount).await
    }

    /// Register a mint listener.
    pub fn subscribe<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&MintEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    /// Remove a mint listener. Unknown handles are ignored.
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        self.listeners.unsubscribe(handle)
    }

    /// The registry an event source publishes into.
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}

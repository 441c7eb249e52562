//! Account synchronization.
//!
//! # Data Flow
//! ```text
//! SessionContext (watch channel)
//!     → client.rs (one refresh task per change)
//!     → fetcher.rs (isRegistered + addressId + numUsers in one multicall)
//!     → state.rs (fenced commit, whole-state swap)
//!
//! UI action
//!     → submitter.rs (register / batchMint through TransactionSender)
//!
//! MintWatcher
//!     → listeners.rs (publish to registered callbacks)
//! ```
//!
//! # Design Decisions
//! - Read failures are logged and the previous state is kept
//! - Write failures are always returned to the caller
//! - No retries anywhere; callers decide

pub mod client;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod listeners;
pub mod state;
pub mod submitter;

pub use client::AccountSyncClient;
pub use context::{SessionContext, AUTH_TOKEN_ENV_VAR};
pub use error::{SyncError, SyncResult};
pub use fetcher::StateFetcher;
pub use listeners::{ListenerHandle, ListenerRegistry, MintListener};
pub use state::{RefreshOutcome, StateStore, SyncedAccountState};
pub use submitter::{SubmittedTx, TransactionSubmitter, TxKind};

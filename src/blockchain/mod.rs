//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Config (RPC URLs, contract addresses) + environment (private key)
//!     → contracts.rs (sol! bindings, chain → address resolution)
//!     → client.rs (read-only calls and logs, with failover and timeouts)
//!     → multicall.rs (batched reads in one round trip)
//!     → wallet.rs + transaction.rs (sign, broadcast, optional confirmation)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys, auth tokens or calldata carrying them
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contracts;
pub mod multicall;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{BlockchainClient, ContractCaller, LogReader};
pub use contracts::{ContractKind, ContractRegistry};
pub use multicall::{MulticallBatch, MulticallResult};
pub use transaction::{wait_for_confirmation, TransactionSender, WalletSender};
pub use types::{BlockchainConfig, BlockchainError, BlockchainResult, ConfirmationStatus};
pub use wallet::Wallet;

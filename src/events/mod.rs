//! Mint event ingestion.
//!
//! # Data Flow
//! ```text
//! FriendKey tier contracts (TransferBatch logs)
//!     → watcher.rs (confirmed range polling, mint filter, tier mapping)
//!     → ListenerRegistry::publish
//!     → registered callbacks
//! ```

pub mod types;
pub mod watcher;

pub use types::MintEvent;
pub use watcher::MintWatcher;

//! FriendFi account sync library

pub mod blockchain;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod observability;
pub mod sync;

pub use config::schema::SyncConfig;
pub use events::{MintEvent, MintWatcher};
pub use lifecycle::Shutdown;
pub use sync::{AccountSyncClient, SessionContext, SyncedAccountState};

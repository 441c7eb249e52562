//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SyncConfig (validated, immutable)
//!     → ContractRegistry / BlockchainClient / SessionContext
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All sections have defaults to allow minimal configs
//! - Secrets are never part of the file; binaries read them from the environment

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BlockchainConfig, ChainContractsConfig, EventsConfig, MintingConfig, ObservabilityConfig,
    SessionConfig, SyncConfig,
};

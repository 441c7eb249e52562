//! Shape of `friendfi.toml`.
//!
//! All types derive Serde traits for deserialization from a TOML file.
//! Secrets (auth token, private key) never live here; they are read from the
//! environment by the binaries.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Canonical Multicall3 deployment, identical on every major EVM chain.
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SyncConfig {
    /// RPC connectivity and transaction settings.
    pub rpc: BlockchainConfig,

    /// Who we are syncing for.
    pub session: SessionConfig,

    /// Contract deployments, one entry per chain.
    pub contracts: Vec<ChainContractsConfig>,

    /// Mint submission settings.
    pub minting: MintingConfig,

    /// Mint event watcher settings.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// RPC endpoints and transaction settings, shared by reads and writes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Primary endpoint. Transactions are always broadcast here.
    pub rpc_url: String,

    /// Extra endpoints tried in order when the primary fails a read.
    pub failover_urls: Vec<String>,

    /// Chain the session runs on (31337 for a local Anvil node).
    pub chain_id: u64,

    /// Per-request timeout, in seconds.
    pub rpc_timeout_secs: u64,

    /// Blocks a receipt or mint log must be buried under.
    pub confirmation_blocks: u32,

    /// Factor applied to the node's gas price (1.2 adds 20%).
    pub gas_price_multiplier: f64,

    /// Refuse to send while the node's gas price is above this, in gwei.
    pub max_gas_price_gwei: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".into(),
            failover_urls: vec![],
            chain_id: 1,
            rpc_timeout_secs: 10,
            confirmation_blocks: 3,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
        }
    }
}

/// Static part of the session. The auth token comes from `FRIENDFI_AUTH_TOKEN`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Identity issued by the authentication layer.
    pub identity: Option<String>,

    /// Wallet address to sync. Defaults to the signer address when a key is present.
    pub wallet_address: Option<Address>,
}

/// Contract addresses for a single chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainContractsConfig {
    pub chain_id: u64,

    /// UserManager (registration, account index, user count).
    pub user_manager: Address,

    /// FriendKeyManager (mint fee, batch mint).
    pub friend_key_manager: Address,

    /// FriendKey token contracts, indexed by tier level.
    #[serde(default)]
    pub friend_keys: Vec<Address>,

    #[serde(default = "default_multicall")]
    pub multicall: Address,
}

fn default_multicall() -> Address {
    MULTICALL3_ADDRESS
}

/// Mint submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MintingConfig {
    /// Refuse to submit a mint whose quoted fee exceeds this many gwei.
    /// Unset means any fee quoted by the contract is accepted.
    pub max_mint_fee_gwei: Option<u64>,
}

/// Mint event watcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Enable the mint event watcher.
    pub enabled: bool,

    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Widest block range requested in one `eth_getLogs`. Older blocks are
    /// scanned in chunks of this size until the watcher reaches the head.
    pub max_block_range: u64,

    /// First block to scan. Unset starts from the current head.
    pub start_block: Option<u64>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: 4000,
            max_block_range: 2000,
            start_block: None,
        }
    }
}

/// Logging and metrics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Level for this crate's targets. `RUST_LOG` overrides it when set.
    pub log_level: String,

    /// Serve Prometheus metrics.
    pub metrics_enabled: bool,

    /// Where the scrape endpoint listens.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".into(),
        }
    }
}

//! FriendFi account sync daemon
//!
//! Follows a session, keeps the on-chain account state in sync and logs
//! FriendKey mints as they are confirmed.
//!
//! # Architecture Overview
//!
//! ```text
//!   friendfi.toml + env (FRIENDFI_AUTH_TOKEN, FRIENDFI_PRIVATE_KEY)
//!        │
//!        ▼
//!   ┌──────────────┐  watch   ┌───────────────────┐  multicall  ┌──────────┐
//!   │SessionContext│─────────▶│ AccountSyncClient │────────────▶│ RPC node │
//!   └──────────────┘          │ fetcher/submitter │◀────────────│          │
//!        ▲                    └─────────┬─────────┘             └────┬─────┘
//!        │ refresh on own mint          │ publish                    │ logs
//!        │                    ┌─────────▼─────────┐                  │
//!        └────────────────────│ ListenerRegistry  │◀─── MintWatcher ◀┘
//!                             └───────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use friendfi_sync::blockchain::{BlockchainClient, ContractRegistry, Wallet, WalletSender};
use friendfi_sync::config::load_config;
use friendfi_sync::lifecycle::{wait_for_signal, Shutdown};
use friendfi_sync::observability::{logging, metrics};
use friendfi_sync::sync::{AccountSyncClient, SessionContext, AUTH_TOKEN_ENV_VAR};
use friendfi_sync::MintWatcher;

/// Environment variable overriding the config file location.
const CONFIG_ENV_VAR: &str = "FRIENDFI_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "friendfi.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path: PathBuf = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into();

    let config = load_config(&config_path)?;
    logging::init(&config.observability.log_level);

    tracing::info!(
        config = %config_path.display(),
        chain_id = config.rpc.chain_id,
        rpc_url = %config.rpc.rpc_url,
        events_enabled = config.events.enabled,
        "friendfi-sync v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let client = Arc::new(BlockchainClient::new(config.rpc.clone()).await?);
    client.verify_chain_id().await?;

    let wallet = Wallet::from_env(config.rpc.chain_id)?;
    let sender = Arc::new(WalletSender::new(&wallet, &config.rpc)?);
    let contracts = Arc::new(ContractRegistry::new(config.contracts.clone()));

    let sync = Arc::new(
        AccountSyncClient::new(Arc::clone(&client), sender, Arc::clone(&contracts))
            .with_max_mint_fee_gwei(config.minting.max_mint_fee_gwei),
    );

    let auth_token = std::env::var(AUTH_TOKEN_ENV_VAR).ok();
    if auth_token.is_none() {
        tracing::warn!(env = AUTH_TOKEN_ENV_VAR, "No auth token set, registration will be unavailable");
    }
    let context = SessionContext::from_config(&config, auth_token, Some(wallet.address()));
    let wallet_address = context.wallet_address;
    let (context_tx, context_rx) = watch::channel(context);
    let context_tx = Arc::new(context_tx);

    // A mint to our own wallet changes addressId; re-publish the context to refresh.
    let refresh_on_mint = Arc::clone(&context_tx);
    sync.subscribe(move |event| {
        tracing::info!(
            level = event.level,
            to = %event.to,
            amount = %event.total_amount(),
            block = ?event.block_number,
            "FriendKey minted"
        );
        if Some(event.to) == wallet_address {
            refresh_on_mint.send_modify(|_| {});
        }
    });

    let shutdown = Shutdown::new();
    let follower = tokio::spawn(Arc::clone(&sync).follow_context(context_rx, shutdown.subscribe()));

    let watcher = if config.events.enabled {
        let keys = contracts.friend_keys(config.rpc.chain_id);
        let watcher = MintWatcher::new(
            Arc::clone(&client),
            keys,
            &config.events,
            config.rpc.confirmation_blocks,
        );
        Some(tokio::spawn(watcher.run(sync.listeners().clone(), shutdown.subscribe())))
    } else {
        tracing::info!("Mint event watcher disabled");
        None
    };

    wait_for_signal().await;
    shutdown.trigger();

    let _ = follower.await;
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }

    let state = sync.state();
    tracing::info!(
        is_registered = state.is_registered,
        nft_id = state.nft_id,
        num_users = state.num_users,
        "Shutdown complete"
    );
    Ok(())
}

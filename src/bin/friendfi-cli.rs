use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use friendfi_sync::blockchain::{wait_for_confirmation, BlockchainClient, ContractRegistry, Wallet, WalletSender};
use friendfi_sync::config::{load_config, SyncConfig};
use friendfi_sync::sync::{AccountSyncClient, SessionContext, StateFetcher, SubmittedTx, AUTH_TOKEN_ENV_VAR};

/// How long `--wait` waits for the configured confirmation depth.
const CONFIRMATION_TIMEOUT_SECS: u64 = 300;

#[derive(Parser)]
#[command(name = "friendfi-cli")]
#[command(about = "One-shot FriendFi account commands", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "friendfi.toml")]
    config: PathBuf,

    /// Use this identity instead of the one in the config file
    #[arg(short, long)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read registration, NFT id and user count
    Status,
    /// Quote the fee for minting keys
    Fee { amount: u64 },
    /// Register the identity on chain (needs FRIENDFI_PRIVATE_KEY and FRIENDFI_AUTH_TOKEN)
    Register {
        /// Wait for confirmation before exiting
        #[arg(long)]
        wait: bool,
    },
    /// Mint keys to the session wallet (needs FRIENDFI_PRIVATE_KEY)
    Mint {
        amount: u64,
        /// Wait for confirmation before exiting
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let client = Arc::new(BlockchainClient::new(config.rpc.clone()).await?);
    let contracts = Arc::new(ContractRegistry::new(config.contracts.clone()));

    match cli.command {
        Commands::Status => {
            let wallet = Wallet::from_env(config.rpc.chain_id).ok();
            let context = session(&config, cli.identity, wallet.as_ref());
            let state = StateFetcher::new(client, contracts).fetch(&context).await?;
            print_json(&json!({
                "identity": context.identity(),
                "wallet": context.wallet_address,
                "state": state,
            }))?;
        }
        Commands::Fee { amount } => {
            let context = session(&config, cli.identity, None);
            let fee = StateFetcher::new(client, contracts).mint_fee(&context, amount).await?;
            print_json(&json!({ "amount": amount, "fee_wei": fee.to_string() }))?;
        }
        Commands::Register { wait } => {
            let wallet = Wallet::from_env(config.rpc.chain_id)?;
            let context = session(&config, cli.identity, Some(&wallet));
            let sync = sync_client(&config, &client, contracts, &wallet)?;
            let tx = sync.register(&context).await?;
            report(&client, tx, wait).await?;
        }
        Commands::Mint { amount, wait } => {
            let wallet = Wallet::from_env(config.rpc.chain_id)?;
            let context = session(&config, cli.identity, Some(&wallet));
            let sync = sync_client(&config, &client, contracts, &wallet)?;
            let tx = sync.batch_mint(&context, amount).await?;
            report(&client, tx, wait).await?;
        }
    }

    Ok(())
}

fn session(config: &SyncConfig, identity: Option<String>, wallet: Option<&Wallet>) -> SessionContext {
    let auth_token = std::env::var(AUTH_TOKEN_ENV_VAR).ok();
    let context = SessionContext::from_config(config, auth_token, wallet.map(Wallet::address));
    match identity {
        Some(identity) => context.with_identity(identity),
        None => context,
    }
}

fn sync_client(
    config: &SyncConfig,
    client: &Arc<BlockchainClient>,
    contracts: Arc<ContractRegistry>,
    wallet: &Wallet,
) -> Result<AccountSyncClient<BlockchainClient, WalletSender>, Box<dyn std::error::Error>> {
    let sender = Arc::new(WalletSender::new(wallet, &config.rpc)?);
    Ok(AccountSyncClient::new(Arc::clone(client), sender, contracts)
        .with_max_mint_fee_gwei(config.minting.max_mint_fee_gwei))
}

async fn report(client: &BlockchainClient, tx: SubmittedTx, wait: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !wait {
        return print_json(&tx);
    }

    eprintln!("Waiting for {} confirmations of {}...", client.confirmation_blocks(), tx.tx_hash);
    let confirmation = wait_for_confirmation(client, tx.tx_hash, CONFIRMATION_TIMEOUT_SECS).await?;
    print_json(&json!({ "transaction": tx, "confirmation": confirmation }))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

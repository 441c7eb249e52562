//! Transaction broadcasting and optional confirmation monitoring.
//!
//! # Responsibilities
//! - Apply the gas price ceiling and multiplier
//! - Sign and broadcast transactions through a wallet-backed provider
//! - Monitor confirmations for callers that ask for it

use std::future::Future;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use tokio::time::{sleep, timeout, Instant};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{
    BlockchainConfig, BlockchainError, BlockchainResult, ConfirmationStatus,
};
use crate::blockchain::wallet::Wallet;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Transaction-sending capability.
///
/// Returns as soon as the node accepts the transaction; confirmation is the
/// caller's concern.
pub trait TransactionSender: Send + Sync {
    fn send(
        &self,
        to: Address,
        data: Bytes,
        value: Option<U256>,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send;
}

/// Reject a node gas price above `max_gas_price_gwei`, otherwise scale it by
/// `gas_price_multiplier`.
pub fn apply_gas_policy(gas_price: u128, config: &BlockchainConfig) -> BlockchainResult<u128> {
    let current_gwei = gas_price / WEI_PER_GWEI;
    if current_gwei > u128::from(config.max_gas_price_gwei) {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: u64::try_from(current_gwei).unwrap_or(u64::MAX),
            max_gwei: config.max_gas_price_gwei,
        });
    }

    Ok((gas_price as f64 * config.gas_price_multiplier) as u128)
}

/// Sends transactions signed by a local [`Wallet`].
#[derive(Clone)]
pub struct WalletSender {
    provider: DynProvider,
    from: Address,
    config: BlockchainConfig,
    timeout_duration: Duration,
}

impl WalletSender {
    /// Build a signing provider on the primary RPC endpoint.
    pub fn new(wallet: &Wallet, config: &BlockchainConfig) -> BlockchainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let provider = ProviderBuilder::new()
            .wallet(wallet.signer())
            .with_chain_id(wallet.chain_id())
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            from: wallet.address(),
            config: config.clone(),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    /// Address transactions are sent from.
    pub fn address(&self) -> Address {
        self.from
    }

    async fn broadcast(&self, to: Address, data: Bytes, value: Option<U256>) -> BlockchainResult<TxHash> {
        let gas_price = timeout(self.timeout_duration, self.provider.get_gas_price())
            .await
            .map_err(|_| BlockchainError::Timeout(self.config.rpc_timeout_secs))?
            .map_err(|e| BlockchainError::Rpc(format!("Failed to get gas price: {}", e)))?;
        let gas_price = apply_gas_policy(gas_price, &self.config)?;

        let mut tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(to)
            .with_input(data)
            .with_gas_price(gas_price);
        if let Some(value) = value {
            tx = tx.with_value(value);
        }

        let pending = timeout(self.timeout_duration, self.provider.send_transaction(tx))
            .await
            .map_err(|_| BlockchainError::Timeout(self.config.rpc_timeout_secs))?
            .map_err(|e| BlockchainError::Rpc(format!("Broadcast failed: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(
            tx_hash = %tx_hash,
            to = %to,
            value = %value.unwrap_or_default(),
            "Transaction broadcast"
        );
        Ok(tx_hash)
    }
}

impl TransactionSender for WalletSender {
    fn send(
        &self,
        to: Address,
        data: Bytes,
        value: Option<U256>,
    ) -> impl Future<Output = BlockchainResult<TxHash>> + Send {
        self.broadcast(to, data, value)
    }
}

impl std::fmt::Debug for WalletSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSender")
            .field("from", &self.from)
            .field("rpc_url", &self.config.rpc_url)
            .finish()
    }
}

/// Poll until `tx_hash` is mined and buried under the configured number of
/// blocks, or `timeout_secs` elapse. A reverted receipt is reported as
/// [`ConfirmationStatus::Failed`] as soon as it is seen.
pub async fn wait_for_confirmation(
    client: &BlockchainClient,
    tx_hash: TxHash,
    timeout_secs: u64,
) -> BlockchainResult<ConfirmationStatus> {
    let required = client.confirmation_blocks();
    let deadline = Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        match client.get_transaction_receipt(tx_hash).await? {
            Some(receipt) if !receipt.status() => {
                tracing::warn!(tx_hash = %tx_hash, "Transaction reverted");
                return Ok(ConfirmationStatus::Failed {
                    reason: "Transaction reverted".to_string(),
                });
            }
            Some(receipt) => {
                let head = client.get_block_number().await?;
                let mined_at = receipt.block_number.unwrap_or(head);
                let depth = head.saturating_sub(mined_at);
                if depth >= u64::from(required) {
                    return Ok(ConfirmationStatus::Confirmed { block_number: mined_at });
                }
                tracing::debug!(tx_hash = %tx_hash, depth, required, "Waiting for confirmations");
            }
            None => tracing::debug!(tx_hash = %tx_hash, "Transaction not mined yet"),
        }

        if Instant::now() + RECEIPT_POLL_INTERVAL > deadline {
            return Err(BlockchainError::ConfirmationTimeout(required));
        }
        sleep(RECEIPT_POLL_INTERVAL).await;
    }
}

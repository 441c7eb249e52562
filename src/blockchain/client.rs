//! Read-side RPC access with per-request timeouts and endpoint failover.
//!
//! # Responsibilities
//! - `eth_call` for the account reads and the mint fee quote
//! - Block numbers and logs for the mint watcher
//! - Receipts for confirmation tracking
//!
//! Every request walks the endpoints in order (primary first) and returns the
//! first answer that arrives within `rpc_timeout_secs`.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionReceipt, TransactionRequest};
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult};

/// Read-only contract call capability.
pub trait ContractCaller: Send + Sync {
    /// Execute `data` against `to` with `eth_call` and return the raw result.
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = BlockchainResult<Bytes>> + Send;
}

/// Log query capability used by the mint watcher.
pub trait LogReader: Send + Sync {
    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    fn logs(&self, filter: &Filter) -> impl Future<Output = BlockchainResult<Vec<Log>>> + Send;
}

type SharedProvider = Arc<dyn Provider + Send + Sync>;

/// Try `$request` on each endpoint until one answers in time.
///
/// All endpoints timing out is reported as `Timeout`, anything else as `Rpc`
/// carrying the last error seen.
macro_rules! failover {
    ($client:expr, $what:literal, |$provider:ident| $request:expr) => {{
        let mut last_error: Option<String> = None;
        for (idx, $provider) in $client.endpoints.iter().enumerate() {
            match timeout($client.timeout_duration, $request).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    tracing::warn!(endpoint = idx, request = $what, error = %e, "RPC request failed");
                    last_error = Some(e.to_string());
                }
                Err(_) => tracing::warn!(endpoint = idx, request = $what, "RPC request timed out"),
            }
        }
        match last_error {
            Some(e) => Err(BlockchainError::Rpc(format!("{} failed on every endpoint: {}", $what, e))),
            None => Err(BlockchainError::Timeout($client.config.rpc_timeout_secs)),
        }
    }};
}

/// Read-only JSON-RPC client over the primary and failover endpoints.
#[derive(Clone)]
pub struct BlockchainClient {
    endpoints: Vec<SharedProvider>,
    config: BlockchainConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Connect to the configured endpoints.
    ///
    /// Fails only on an unparsable primary URL. Invalid failover URLs are
    /// skipped; nothing is contacted until the first request.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let primary: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let mut endpoints: Vec<SharedProvider> = vec![Arc::new(ProviderBuilder::new().connect_http(primary))];
        for raw in &config.failover_urls {
            match raw.parse::<url::Url>() {
                Ok(url) => endpoints.push(Arc::new(ProviderBuilder::new().connect_http(url))),
                Err(_) => tracing::warn!(url = %raw, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            failovers = endpoints.len() - 1,
            chain_id = config.chain_id,
            "RPC client ready"
        );

        Ok(Self {
            endpoints,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            config,
        })
    }

    /// Fail unless the node reports the configured chain id.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = self.get_chain_id().await?;
        if actual != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }
        tracing::info!(chain_id = actual, "Connected to expected chain");
        Ok(())
    }

    pub async fn get_chain_id(&self) -> BlockchainResult<u64> {
        failover!(self, "eth_chainId", |provider| provider.get_chain_id())
    }

    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        failover!(self, "eth_blockNumber", |provider| provider.get_block_number())
    }

    /// `eth_call` against the latest block.
    pub async fn eth_call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        failover!(self, "eth_call", |provider| provider.call(request.clone()).into_future())
    }

    pub async fn get_logs(&self, filter: &Filter) -> BlockchainResult<Vec<Log>> {
        failover!(self, "eth_getLogs", |provider| provider.get_logs(filter))
    }

    pub async fn get_transaction_receipt(&self, tx_hash: TxHash) -> BlockchainResult<Option<TransactionReceipt>> {
        failover!(self, "eth_getTransactionReceipt", |provider| provider.get_transaction_receipt(tx_hash))
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Blocks a receipt must be buried under before it counts as confirmed.
    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

impl ContractCaller for BlockchainClient {
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = BlockchainResult<Bytes>> + Send {
        self.eth_call(to, data)
    }
}

impl LogReader for BlockchainClient {
    fn block_number(&self) -> impl Future<Output = BlockchainResult<u64>> + Send {
        self.get_block_number()
    }

    fn logs(&self, filter: &Filter) -> impl Future<Output = BlockchainResult<Vec<Log>>> + Send {
        self.get_logs(filter)
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("endpoints", &self.endpoints.len())
            .field("chain_id", &self.config.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> BlockchainConfig {
        BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            chain_id: 31337,
            rpc_timeout_secs: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_does_not_contact_node() {
        let client = BlockchainClient::new(local_config()).await.unwrap();
        assert_eq!(client.confirmation_blocks(), 3);
        assert_eq!(client.endpoints.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_primary_url() {
        let config = BlockchainConfig {
            rpc_url: "not a url".to_string(),
            ..local_config()
        };
        let err = BlockchainClient::new(config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_invalid_failover_is_skipped() {
        let config = BlockchainConfig {
            failover_urls: vec!["::bad::".to_string(), "http://127.0.0.1:2".to_string()],
            ..local_config()
        };
        let client = BlockchainClient::new(config).await.unwrap();
        assert_eq!(client.endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_every_endpoint_failing_is_error() {
        let config = BlockchainConfig {
            failover_urls: vec!["http://127.0.0.1:2".to_string()],
            ..local_config()
        };
        let client = BlockchainClient::new(config).await.unwrap();

        let err = client.get_chain_id().await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rpc(_) | BlockchainError::Timeout(2)));

        let err = client.eth_call(Address::ZERO, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rpc(_) | BlockchainError::Timeout(2)));
    }
}

//! Mint event watcher.
//!
//! Polls `TransferBatch` logs on every FriendKey tier contract, keeps only
//! mints (transfers from the zero address) and hands them to the listener
//! registry. Only blocks at least `confirmation_blocks` deep are scanned.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::blockchain::contracts::FriendKey::TransferBatch;
use crate::blockchain::{BlockchainResult, LogReader};
use crate::config::EventsConfig;
use crate::events::types::MintEvent;
use crate::observability::metrics;
use crate::sync::ListenerRegistry;

/// Turns chain logs into [`MintEvent`]s.
pub struct MintWatcher<R> {
    reader: Arc<R>,
    /// (tier level, contract address)
    keys: Vec<(u8, Address)>,
    confirmation_blocks: u64,
    poll_interval: Duration,
    /// Widest range sent in a single `eth_getLogs`.
    max_block_range: u64,
    /// Next block to scan. `None` until the first poll pins it to the confirmed head.
    next_block: Option<u64>,
    /// Whether the last poll reached the confirmed head.
    caught_up: bool,
}

impl<R: LogReader> MintWatcher<R> {
    pub fn new(reader: Arc<R>, keys: Vec<(u8, Address)>, config: &EventsConfig, confirmation_blocks: u32) -> Self {
        Self {
            reader,
            keys,
            confirmation_blocks: u64::from(confirmation_blocks),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_block_range: config.max_block_range.max(1),
            next_block: config.start_block,
            caught_up: false,
        }
    }

    /// Next block the watcher will scan, if pinned.
    pub fn next_block(&self) -> Option<u64> {
        self.next_block
    }

    /// True once a poll has scanned up to the confirmed head.
    pub fn is_caught_up(&self) -> bool {
        self.caught_up
    }

    /// Scan the next confirmed chunk of at most `max_block_range` blocks.
    ///
    /// A watcher far behind the head needs several polls to catch up. On error
    /// `next_block` stays put and the same chunk is retried.
    pub async fn poll_once(&mut self) -> BlockchainResult<Vec<MintEvent>> {
        let head = self.reader.block_number().await?;
        let target = head.saturating_sub(self.confirmation_blocks);

        let from = match self.next_block {
            Some(block) => block,
            None => {
                self.next_block = Some(target + 1);
                self.caught_up = true;
                tracing::info!(block = target + 1, "Mint watcher starting at confirmed head");
                return Ok(Vec::new());
            }
        };

        if target < from || self.keys.is_empty() {
            self.caught_up = true;
            return Ok(Vec::new());
        }

        let to = target.min(from.saturating_add(self.max_block_range - 1));
        let filter = Filter::new()
            .address(self.keys.iter().map(|(_, address)| *address).collect::<Vec<_>>())
            .event_signature(TransferBatch::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);

        let logs = self.reader.logs(&filter).await?;
        let events: Vec<MintEvent> = logs.iter().filter_map(|log| self.decode(log)).collect();

        tracing::debug!(from, to, target, logs = logs.len(), mints = events.len(), "Scanned mint logs");
        self.next_block = Some(to + 1);
        self.caught_up = to == target;
        Ok(events)
    }

    fn decode(&self, log: &Log) -> Option<MintEvent> {
        let emitter = log.inner.address;
        let level = self
            .keys
            .iter()
            .find(|(_, address)| *address == emitter)
            .map(|(level, _)| *level)?;

        let decoded = match log.log_decode::<TransferBatch>() {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(address = %emitter, error = %e, "Skipping undecodable TransferBatch log");
                return None;
            }
        };
        let event = decoded.inner.data;

        if event.from != Address::ZERO {
            return None;
        }

        Some(MintEvent {
            level,
            operator: event.operator,
            from: event.from,
            to: event.to,
            ids: event.ids,
            values: event.values,
            tx_hash: log.transaction_hash,
            block_number: log.block_number,
        })
    }

    /// Lazily yield mint events, polling whenever the buffer runs dry.
    ///
    /// While behind the head, chunks are fetched back to back. Poll errors are
    /// logged and retried on the next interval. To restart from a known point,
    /// build a new watcher with `start_block` set.
    pub fn into_stream(self) -> impl Stream<Item = MintEvent> + Send
    where
        R: 'static,
    {
        stream::unfold((self, VecDeque::new()), |(mut watcher, mut pending)| async move {
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((event, (watcher, pending)));
                }
                let failed = match watcher.poll_once().await {
                    Ok(events) => {
                        pending.extend(events);
                        false
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Error polling mint events");
                        true
                    }
                };
                if pending.is_empty() && (failed || watcher.is_caught_up()) {
                    sleep(watcher.poll_interval).await;
                }
            }
        })
    }

    /// Publish every mint to `registry` until shutdown.
    pub async fn run(self, registry: ListenerRegistry, mut shutdown: broadcast::Receiver<()>)
    where
        R: 'static,
    {
        tracing::info!(contracts = self.keys.len(), "Mint watcher started");

        let events = self.into_stream();
        futures_util::pin_mut!(events);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Mint watcher stopping");
                    break;
                }
                next = events.next() => match next {
                    Some(event) => {
                        metrics::record_mint_event(event.level);
                        let delivered = registry.publish(&event);
                        tracing::debug!(
                            level = event.level,
                            to = %event.to,
                            delivered,
                            "Mint event published"
                        );
                    }
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::contracts::FriendKey;
    use crate::blockchain::BlockchainError;
    use alloy::primitives::{address, TxHash, U256};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const KEY0: Address = address!("0x1010101010101010101010101010101010101010");
    const KEY1: Address = address!("0x1111111111111111111111111111111111111111");

    /// Serves `logs` by block range, like a node would.
    struct MockReader {
        head: Mutex<u64>,
        logs: Mutex<Vec<Log>>,
        filters: Mutex<Vec<Filter>>,
        /// Widest range the node accepts.
        range_limit: Option<u64>,
        /// `block_number` calls left to fail.
        head_failures: AtomicUsize,
    }

    impl MockReader {
        fn new(head: u64, logs: Vec<Log>) -> Self {
            Self {
                head: Mutex::new(head),
                logs: Mutex::new(logs),
                filters: Mutex::new(Vec::new()),
                range_limit: None,
                head_failures: AtomicUsize::new(0),
            }
        }

        fn with_range_limit(mut self, limit: u64) -> Self {
            self.range_limit = Some(limit);
            self
        }

        fn failing_head(self, times: usize) -> Self {
            self.head_failures.store(times, Ordering::SeqCst);
            self
        }
    }

    impl LogReader for MockReader {
        async fn block_number(&self) -> BlockchainResult<u64> {
            let failing = self
                .head_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(BlockchainError::Rpc("connection refused".into()));
            }
            Ok(*self.head.lock().unwrap())
        }

        async fn logs(&self, filter: &Filter) -> BlockchainResult<Vec<Log>> {
            self.filters.lock().unwrap().push(filter.clone());
            let from = filter.get_from_block().unwrap();
            let to = filter.get_to_block().unwrap();
            if let Some(limit) = self.range_limit {
                if to - from + 1 > limit {
                    return Err(BlockchainError::Rpc(format!("block range exceeds {limit}")));
                }
            }
            let logs = self.logs.lock().unwrap();
            Ok(logs
                .iter()
                .filter(|log| log.block_number.is_some_and(|block| (from..=to).contains(&block)))
                .cloned()
                .collect())
        }
    }

    fn transfer_log(address: Address, from: Address, block: u64) -> Log {
        let event = FriendKey::TransferBatch {
            operator: Address::repeat_byte(0x01),
            from,
            to: Address::repeat_byte(0xab),
            ids: vec![U256::from(7)],
            values: vec![U256::from(5)],
        };
        Log {
            inner: alloy::primitives::Log {
                address,
                data: event.encode_log_data(),
            },
            block_number: Some(block),
            transaction_hash: Some(TxHash::repeat_byte(0x22)),
            ..Default::default()
        }
    }

    fn config(start_block: Option<u64>) -> EventsConfig {
        EventsConfig {
            enabled: true,
            poll_interval_ms: 10,
            max_block_range: 2000,
            start_block,
        }
    }

    #[tokio::test]
    async fn test_first_poll_pins_confirmed_head() {
        let reader = Arc::new(MockReader::new(100, Vec::new()));
        let mut watcher = MintWatcher::new(reader.clone(), vec![(0, KEY0)], &config(None), 3);

        assert!(watcher.poll_once().await.unwrap().is_empty());
        assert_eq!(watcher.next_block(), Some(98));
        assert!(reader.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keeps_only_mints_and_maps_levels() {
        let logs = vec![
            transfer_log(KEY0, Address::ZERO, 95),
            transfer_log(KEY1, Address::repeat_byte(0x99), 96),
            transfer_log(KEY1, Address::ZERO, 97),
            transfer_log(Address::repeat_byte(0x55), Address::ZERO, 97),
        ];
        let reader = Arc::new(MockReader::new(100, logs));
        let mut watcher = MintWatcher::new(reader.clone(), vec![(0, KEY0), (1, KEY1)], &config(Some(90)), 3);

        let events = watcher.poll_once().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, 0);
        assert_eq!(events[1].level, 1);
        assert_eq!(events[1].ids, vec![U256::from(7)]);
        assert_eq!(events[1].values, vec![U256::from(5)]);
        assert_eq!(events[1].tx_hash, Some(TxHash::repeat_byte(0x22)));
        assert_eq!(watcher.next_block(), Some(98));

        let filters = reader.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].get_from_block(), Some(90));
        assert_eq!(filters[0].get_to_block(), Some(97));
    }

    #[tokio::test]
    async fn test_nothing_new_below_confirmations() {
        let reader = Arc::new(MockReader::new(100, Vec::new()));
        let mut watcher = MintWatcher::new(reader.clone(), vec![(0, KEY0)], &config(Some(98)), 3);

        assert!(watcher.poll_once().await.unwrap().is_empty());
        assert_eq!(watcher.next_block(), Some(98));
        assert!(reader.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_yields_buffered_events() {
        let logs = vec![transfer_log(KEY0, Address::ZERO, 5), transfer_log(KEY0, Address::ZERO, 6)];
        let reader = Arc::new(MockReader::new(10, logs));
        let watcher = MintWatcher::new(reader, vec![(0, KEY0)], &config(Some(1)), 0);

        let events: Vec<MintEvent> = watcher.into_stream().take(2).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].block_number, Some(5));
        assert_eq!(events[1].block_number, Some(6));
    }

    #[tokio::test]
    async fn test_large_backlog_is_scanned_in_chunks() {
        let reader = Arc::new(MockReader::new(1_000_000, Vec::new()).with_range_limit(10_000));
        let events = EventsConfig {
            max_block_range: 10_000,
            ..config(Some(0))
        };
        let mut watcher = MintWatcher::new(reader.clone(), vec![(0, KEY0)], &events, 0);

        for _ in 0..3 {
            assert!(watcher.poll_once().await.unwrap().is_empty());
            assert!(!watcher.is_caught_up());
        }
        assert_eq!(watcher.next_block(), Some(30_000));

        let filters = reader.filters.lock().unwrap();
        assert_eq!(filters[2].get_from_block(), Some(20_000));
        assert_eq!(filters[2].get_to_block(), Some(29_999));
    }

    #[tokio::test]
    async fn test_last_chunk_stops_at_confirmed_head() {
        let reader = Arc::new(MockReader::new(25, Vec::new()));
        let events = EventsConfig {
            max_block_range: 10,
            ..config(Some(0))
        };
        let mut watcher = MintWatcher::new(reader.clone(), vec![(0, KEY0)], &events, 3);

        watcher.poll_once().await.unwrap();
        watcher.poll_once().await.unwrap();
        assert!(!watcher.is_caught_up());
        watcher.poll_once().await.unwrap();
        assert!(watcher.is_caught_up());
        assert_eq!(watcher.next_block(), Some(23));
        assert_eq!(reader.filters.lock().unwrap()[2].get_to_block(), Some(22));
    }

    #[tokio::test]
    async fn test_stream_does_not_wait_between_backlog_chunks() {
        let logs = vec![transfer_log(KEY0, Address::ZERO, 25)];
        let reader = Arc::new(MockReader::new(30, logs).with_range_limit(10));
        let events = EventsConfig {
            poll_interval_ms: 60_000,
            max_block_range: 10,
            ..config(Some(0))
        };
        let watcher = MintWatcher::new(reader.clone(), vec![(0, KEY0)], &events, 0);

        let mut stream = Box::pin(watcher.into_stream());
        let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("backlog chunks should be fetched without sleeping")
            .unwrap();
        assert_eq!(event.block_number, Some(25));
        assert_eq!(reader.filters.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stream_retries_after_poll_error() {
        let logs = vec![transfer_log(KEY1, Address::ZERO, 4)];
        let reader = Arc::new(MockReader::new(10, logs).failing_head(2));
        let watcher = MintWatcher::new(reader.clone(), vec![(1, KEY1)], &config(Some(1)), 0);

        let mut stream = Box::pin(watcher.into_stream());
        let event = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("stream should recover after failed polls")
            .unwrap();
        assert_eq!(event.level, 1);
        assert_eq!(event.block_number, Some(4));
        assert_eq!(reader.head_failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_publishes_until_shutdown() {
        let logs = vec![transfer_log(KEY1, Address::ZERO, 5)];
        let reader = Arc::new(MockReader::new(10, logs));
        let watcher = MintWatcher::new(reader, vec![(1, KEY1)], &config(Some(1)), 0);

        let registry = ListenerRegistry::new();
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
        registry.subscribe(move |event| {
            let _ = seen_tx.send(event.level);
        });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(watcher.run(registry, shutdown_rx));

        assert_eq!(seen_rx.recv().await, Some(1));
        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}

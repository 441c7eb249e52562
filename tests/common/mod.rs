//! Shared mocks for integration testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{address, Address, Bytes, TxHash, U256};
use alloy::sol_types::{SolCall, SolValue};

use friendfi_sync::blockchain::contracts::{FriendKeyManager, Multicall3, UserManager};
use friendfi_sync::blockchain::{
    BlockchainError, BlockchainResult, ContractCaller, ContractRegistry, TransactionSender,
};
use friendfi_sync::config::ChainContractsConfig;
use friendfi_sync::config::schema::MULTICALL3_ADDRESS;
use friendfi_sync::sync::{AccountSyncClient, SessionContext};

pub const CHAIN_ID: u64 = 1;
pub const USER_MANAGER: Address = address!("0x00000000000000000000000000000000000000a1");
pub const FRIEND_KEY_MANAGER: Address = address!("0x00000000000000000000000000000000000000a2");
pub const WALLET: Address = address!("0x0000000000000000000000000000000000000abc");

/// The three values a refresh reads.
#[derive(Debug, Clone, Copy)]
pub struct Reads {
    pub is_registered: bool,
    pub nft_id: u64,
    pub num_users: u64,
}

/// One scripted answer to an `aggregate3` call.
#[derive(Debug, Clone, Copy)]
pub struct Scripted {
    pub delay: Duration,
    pub reads: Reads,
}

/// Answers `aggregate3` and `getMintFee` like the deployed contracts would.
///
/// Scripted answers are served first, in order, then `reads` forever.
pub struct MockChain {
    reads: Mutex<Reads>,
    scripted: Mutex<VecDeque<Scripted>>,
    mint_fee: Mutex<U256>,
    fail: AtomicBool,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Address, Bytes)>>,
}

impl MockChain {
    pub fn new(reads: Reads) -> Self {
        Self {
            reads: Mutex::new(reads),
            scripted: Mutex::new(VecDeque::new()),
            mint_fee: Mutex::new(U256::ZERO),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reads(&self, reads: Reads) {
        *self.reads.lock().unwrap() = reads;
    }

    pub fn script(&self, answer: Scripted) {
        self.scripted.lock().unwrap().push_back(answer);
    }

    pub fn set_mint_fee(&self, fee: U256) {
        *self.mint_fee.lock().unwrap() = fee;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(Address, Bytes)> {
        self.seen.lock().unwrap().clone()
    }

    fn answer_read(reads: &Reads, call: &Multicall3::Call3) -> Multicall3::Result {
        let selector: [u8; 4] = call.callData[..4].try_into().unwrap();
        let return_data = match selector {
            UserManager::isRegisteredCall::SELECTOR => reads.is_registered.abi_encode(),
            UserManager::addressIdCall::SELECTOR => U256::from(reads.nft_id).abi_encode(),
            UserManager::numUsersCall::SELECTOR => U256::from(reads.num_users).abi_encode(),
            _ => {
                return Multicall3::Result {
                    success: false,
                    returnData: Bytes::new(),
                }
            }
        };
        Multicall3::Result {
            success: true,
            returnData: Bytes::from(return_data),
        }
    }
}

impl ContractCaller for MockChain {
    async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((to, data.clone()));

        if self.fail.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("connection refused".to_string()));
        }

        let selector: [u8; 4] = data[..4].try_into().unwrap();
        match selector {
            Multicall3::aggregate3Call::SELECTOR => {
                let batch = Multicall3::aggregate3Call::abi_decode(&data)
                    .map_err(|e| BlockchainError::Decode(e.to_string()))?;

                let scripted = self.scripted.lock().unwrap().pop_front();
                let (delay, reads) = match scripted {
                    Some(s) => (s.delay, s.reads),
                    None => (Duration::ZERO, *self.reads.lock().unwrap()),
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let results: Vec<Multicall3::Result> =
                    batch.calls.iter().map(|call| Self::answer_read(&reads, call)).collect();
                Ok(Bytes::from(results.abi_encode()))
            }
            FriendKeyManager::getMintFeeCall::SELECTOR => {
                let fee = *self.mint_fee.lock().unwrap();
                Ok(Bytes::from(fee.abi_encode()))
            }
            _ => Err(BlockchainError::Rpc("execution reverted".to_string())),
        }
    }
}

/// A transaction the sender was asked to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
}

/// Records every transaction instead of broadcasting it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentTx>>,
    fail: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }
}

impl TransactionSender for RecordingSender {
    async fn send(&self, to: Address, data: Bytes, value: Option<U256>) -> BlockchainResult<TxHash> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BlockchainError::Rpc("insufficient funds".to_string()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentTx { to, data, value });
        Ok(TxHash::repeat_byte(sent.len() as u8))
    }
}

pub fn registry() -> ContractRegistry {
    ContractRegistry::new([ChainContractsConfig {
        chain_id: CHAIN_ID,
        user_manager: USER_MANAGER,
        friend_key_manager: FRIEND_KEY_MANAGER,
        friend_keys: Vec::new(),
        multicall: MULTICALL3_ADDRESS,
    }])
}

/// Complete context: identity "u1", chain 1, wallet 0xabc, token "t".
pub fn full_context() -> SessionContext {
    SessionContext::new()
        .with_identity("u1")
        .with_auth_token("t")
        .with_chain_id(CHAIN_ID)
        .with_wallet(WALLET)
        .with_rpc_url("http://localhost:8545".parse().unwrap())
}

pub type TestClient = AccountSyncClient<MockChain, RecordingSender>;

pub fn client(reads: Reads) -> (Arc<TestClient>, Arc<MockChain>, Arc<RecordingSender>) {
    let chain = Arc::new(MockChain::new(reads));
    let sender = Arc::new(RecordingSender::new());
    let client = AccountSyncClient::new(Arc::clone(&chain), Arc::clone(&sender), Arc::new(registry()));
    (Arc::new(client), chain, sender)
}

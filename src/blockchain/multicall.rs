//! Batched read-only calls through Multicall3 `aggregate3`.
//!
//! Independent view calls are packed into a single `eth_call`, so a batch of
//! N reads costs one round trip. Every call is sent with `allowFailure = false`:
//! either all sub-calls succeed or the whole batch reverts.

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;

use crate::blockchain::client::ContractCaller;
use crate::blockchain::contracts::Multicall3;
use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// A batch of view calls waiting to be executed.
#[derive(Debug, Clone)]
pub struct MulticallBatch {
    multicall: Address,
    calls: Vec<Multicall3::Call3>,
}

impl MulticallBatch {
    /// Start an empty batch against the given Multicall3 deployment.
    pub fn new(multicall: Address) -> Self {
        Self {
            multicall,
            calls: Vec::new(),
        }
    }

    /// Queue a call. Returns its index in the result set.
    pub fn add<C: SolCall>(&mut self, target: Address, call: &C) -> usize {
        self.calls.push(Multicall3::Call3 {
            target,
            allowFailure: false,
            callData: Bytes::from(call.abi_encode()),
        });
        self.calls.len() - 1
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Encoded `aggregate3` calldata for this batch.
    pub fn calldata(&self) -> Bytes {
        Bytes::from(
            Multicall3::aggregate3Call {
                calls: self.calls.clone(),
            }
            .abi_encode(),
        )
    }

    /// Execute the batch in one round trip.
    pub async fn execute<P: ContractCaller>(&self, caller: &P) -> BlockchainResult<MulticallResult> {
        let raw = caller.call(self.multicall, self.calldata()).await?;
        let results = Multicall3::aggregate3Call::abi_decode_returns(&raw)
            .map_err(|e| BlockchainError::Decode(format!("aggregate3 return data: {}", e)))?;

        if results.len() != self.calls.len() {
            return Err(BlockchainError::Decode(format!(
                "aggregate3 returned {} results for {} calls",
                results.len(),
                self.calls.len()
            )));
        }

        Ok(MulticallResult { results })
    }
}

/// Raw results of an executed batch, in call order.
#[derive(Debug, Clone)]
pub struct MulticallResult {
    results: Vec<Multicall3::Result>,
}

impl MulticallResult {
    /// Decode the return value of the call at `index` as `C`'s return type.
    pub fn decode<C: SolCall>(&self, index: usize) -> BlockchainResult<C::Return> {
        let result = self
            .results
            .get(index)
            .ok_or_else(|| BlockchainError::Decode(format!("no result at index {}", index)))?;

        if !result.success {
            return Err(BlockchainError::Decode(format!("{} failed", C::SIGNATURE)));
        }

        C::abi_decode_returns(&result.returnData)
            .map_err(|e| BlockchainError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::contracts::UserManager;
    use alloy::primitives::{address, U256};
    use alloy::sol_types::SolValue;
    use std::sync::Mutex;

    const MULTICALL: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

    /// Answers every sub-call with `numUsers() == 7`.
    struct FixedCaller {
        seen: Mutex<Vec<(Address, Bytes)>>,
        success: bool,
    }

    impl ContractCaller for FixedCaller {
        async fn call(&self, to: Address, data: Bytes) -> BlockchainResult<Bytes> {
            self.seen.lock().unwrap().push((to, data.clone()));
            let batch = Multicall3::aggregate3Call::abi_decode(&data).unwrap();
            let results: Vec<Multicall3::Result> = batch
                .calls
                .iter()
                .map(|_| Multicall3::Result {
                    success: self.success,
                    returnData: Bytes::from(U256::from(7).abi_encode()),
                })
                .collect();
            Ok(Bytes::from(results.abi_encode()))
        }
    }

    #[tokio::test]
    async fn test_batch_executes_in_one_call() {
        let caller = FixedCaller {
            seen: Mutex::new(Vec::new()),
            success: true,
        };
        let user_manager = address!("0x1000000000000000000000000000000000000001");

        let mut batch = MulticallBatch::new(MULTICALL);
        let first = batch.add(user_manager, &UserManager::numUsersCall {});
        let second = batch.add(user_manager, &UserManager::numUsersCall {});
        assert_eq!((first, second), (0, 1));

        let result = batch.execute(&caller).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.decode::<UserManager::numUsersCall>(1).unwrap(), U256::from(7));

        let seen = caller.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, MULTICALL);
    }

    #[tokio::test]
    async fn test_failed_subcall_is_decode_error() {
        let caller = FixedCaller {
            seen: Mutex::new(Vec::new()),
            success: false,
        };
        let mut batch = MulticallBatch::new(MULTICALL);
        batch.add(Address::ZERO, &UserManager::numUsersCall {});

        let result = batch.execute(&caller).await.unwrap();
        let err = result.decode::<UserManager::numUsersCall>(0).unwrap_err();
        assert!(err.to_string().contains("numUsers()"));
        assert!(result.decode::<UserManager::numUsersCall>(5).is_err());
    }

    #[test]
    fn test_batch_debug_lists_queued_calls() {
        let mut batch = MulticallBatch::new(MULTICALL);
        batch.add(Address::ZERO, &UserManager::numUsersCall {});

        let copy = batch.clone();
        assert_eq!(copy.calls, batch.calls);

        let printed = format!("{batch:?}");
        assert!(printed.contains("Call3"));
        assert!(printed.contains("allowFailure: false"));
    }
}

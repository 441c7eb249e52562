//! Contract bindings and per-chain address resolution.

use std::collections::HashMap;
use std::fmt;

use alloy::primitives::Address;
use alloy::sol;

use crate::config::schema::ChainContractsConfig;

sol! {
    /// Registration and account index bookkeeping.
    contract UserManager {
        function register(string uuid, string token);
        function isRegistered(string uuid) external view returns (bool);
        function addressId(address account) external view returns (uint256);
        function numUsers() external view returns (uint256);
    }

    /// Fee quoting and batch minting of FriendKeys.
    contract FriendKeyManager {
        function getMintFee(uint256 amount) external view returns (uint256);
        function batchMint(address to, uint256 amount) external payable;
    }

    /// ERC-1155 FriendKey tier contract.
    contract FriendKey {
        #[derive(Debug)]
        event TransferBatch(
            address indexed operator,
            address indexed from,
            address indexed to,
            uint256[] ids,
            uint256[] values
        );
    }

    /// Read aggregation.
    #[sol(all_derives)]
    contract Multicall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
    }
}

/// The contracts this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    UserManager,
    FriendKeyManager,
    /// FriendKey token contract for a tier level.
    FriendKey(u8),
    Multicall,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::UserManager => write!(f, "UserManager"),
            ContractKind::FriendKeyManager => write!(f, "FriendKeyManager"),
            ContractKind::FriendKey(level) => write!(f, "FriendKey[{}]", level),
            ContractKind::Multicall => write!(f, "Multicall3"),
        }
    }
}

/// Deterministic chain ID → contract address lookup.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    chains: HashMap<u64, ChainContractsConfig>,
}

impl ContractRegistry {
    /// Build a registry from validated configuration entries.
    pub fn new(entries: impl IntoIterator<Item = ChainContractsConfig>) -> Self {
        Self {
            chains: entries.into_iter().map(|c| (c.chain_id, c)).collect(),
        }
    }

    /// Resolve the address of `kind` on `chain_id`.
    pub fn resolve(&self, chain_id: u64, kind: ContractKind) -> Option<Address> {
        let chain = self.chains.get(&chain_id)?;
        match kind {
            ContractKind::UserManager => Some(chain.user_manager),
            ContractKind::FriendKeyManager => Some(chain.friend_key_manager),
            ContractKind::FriendKey(level) => chain.friend_keys.get(level as usize).copied(),
            ContractKind::Multicall => Some(chain.multicall),
        }
    }

    /// All FriendKey tier contracts on a chain, as (level, address).
    pub fn friend_keys(&self, chain_id: u64) -> Vec<(u8, Address)> {
        self.chains
            .get(&chain_id)
            .map(|c| {
                c.friend_keys
                    .iter()
                    .enumerate()
                    .map(|(level, address)| (level as u8, *address))
                    .collect()
            })
            .unwrap_or_default()
    }
}

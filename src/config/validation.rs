//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multiplier >= 1.0)
//! - Check contract deployments are unique per chain and non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SyncConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use alloy::primitives::Address;
use thiserror::Error;

use crate::config::schema::SyncConfig;

/// Maximum number of FriendKey tiers.
pub const MAX_KEY_LEVELS: usize = 3;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid URL '{url}' in {field}")]
    InvalidUrl { field: &'static str, url: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("rpc.gas_price_multiplier must be at least 1.0")]
    GasMultiplierTooLow,

    #[error("contracts for chain {0} are declared more than once")]
    DuplicateChain(u64),

    #[error("{field} for chain {chain_id} is the zero address")]
    ZeroAddress { chain_id: u64, field: &'static str },

    #[error("chain {chain_id} declares {count} friend_keys, at most 3 are supported")]
    TooManyKeyLevels { chain_id: u64, count: usize },

    #[error("events are enabled but chain {0} has no friend_keys configured")]
    NoKeysToWatch(u64),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &SyncConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if url::Url::parse(&config.rpc.rpc_url).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "rpc.rpc_url",
            url: config.rpc.rpc_url.clone(),
        });
    }
    for failover in &config.rpc.failover_urls {
        if url::Url::parse(failover).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "rpc.failover_urls",
                url: failover.clone(),
            });
        }
    }
    if config.rpc.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "rpc.rpc_timeout_secs" });
    }
    if config.rpc.gas_price_multiplier < 1.0 {
        errors.push(ValidationError::GasMultiplierTooLow);
    }

    let mut seen = HashSet::new();
    for chain in &config.contracts {
        if !seen.insert(chain.chain_id) {
            errors.push(ValidationError::DuplicateChain(chain.chain_id));
        }
        for (field, address) in [
            ("user_manager", chain.user_manager),
            ("friend_key_manager", chain.friend_key_manager),
            ("multicall", chain.multicall),
        ] {
            if address == Address::ZERO {
                errors.push(ValidationError::ZeroAddress { chain_id: chain.chain_id, field });
            }
        }
        if chain.friend_keys.len() > MAX_KEY_LEVELS {
            errors.push(ValidationError::TooManyKeyLevels {
                chain_id: chain.chain_id,
                count: chain.friend_keys.len(),
            });
        }
    }

    if config.events.enabled {
        if config.events.poll_interval_ms == 0 {
            errors.push(ValidationError::Zero { field: "events.poll_interval_ms" });
        }
        if config.events.max_block_range == 0 {
            errors.push(ValidationError::Zero { field: "events.max_block_range" });
        }
        let has_keys = config
            .contracts
            .iter()
            .any(|c| c.chain_id == config.rpc.chain_id && !c.friend_keys.is_empty());
        if !has_keys {
            errors.push(ValidationError::NoKeysToWatch(config.rpc.chain_id));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

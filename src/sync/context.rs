//! Session context supplied by the surrounding application.

use std::fmt;

use alloy::primitives::Address;
use url::Url;

use crate::config::SyncConfig;
use crate::sync::error::SyncError;

/// Environment variable carrying the auth token issued with the identity.
pub const AUTH_TOKEN_ENV_VAR: &str = "FRIENDFI_AUTH_TOKEN";

/// Who is syncing, on which chain, through which endpoint.
///
/// Read-only to this crate. A new value is supplied whenever the session,
/// network or wallet changes. Empty strings are treated as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub identity: Option<String>,
    pub auth_token: Option<String>,
    pub chain_id: Option<u64>,
    pub wallet_address: Option<Address>,
    pub rpc_url: Option<Url>,
}

/// The fields a state refresh needs, all present.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadScope<'a> {
    pub identity: &'a str,
    pub chain_id: u64,
    pub wallet: Address,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_wallet(mut self, wallet: Address) -> Self {
        self.wallet_address = Some(wallet);
        self
    }

    pub fn with_rpc_url(mut self, url: Url) -> Self {
        self.rpc_url = Some(url);
        self
    }

    /// Build a context from configuration plus an auth token from the environment.
    ///
    /// `signer` fills in the wallet address when the config leaves it unset.
    pub fn from_config(config: &SyncConfig, auth_token: Option<String>, signer: Option<Address>) -> Self {
        Self {
            identity: config.session.identity.clone(),
            auth_token,
            chain_id: Some(config.rpc.chain_id),
            wallet_address: config.session.wallet_address.or(signer),
            rpc_url: config.rpc.rpc_url.parse().ok(),
        }
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref().filter(|s| !s.is_empty())
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|s| !s.is_empty())
    }

    /// Everything a refresh needs, or the first missing field.
    pub(crate) fn read_scope(&self) -> Result<ReadScope<'_>, SyncError> {
        let identity = self
            .identity()
            .ok_or(SyncError::ContextIncomplete { missing: "identity" })?;
        let chain_id = self
            .chain_id
            .ok_or(SyncError::ContextIncomplete { missing: "chain_id" })?;
        let wallet = self
            .wallet_address
            .ok_or(SyncError::ContextIncomplete { missing: "wallet_address" })?;
        if self.rpc_url.is_none() {
            return Err(SyncError::ContextIncomplete { missing: "rpc_url" });
        }

        Ok(ReadScope {
            identity,
            chain_id,
            wallet,
        })
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("identity", &self.identity)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("chain_id", &self.chain_id)
            .field("wallet_address", &self.wallet_address)
            .field("rpc_url", &self.rpc_url.as_ref().map(Url::as_str))
            .finish()
    }
}

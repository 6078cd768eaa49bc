//! External collaborators: chain state and block history.
//!
//! Both traits are read-only and async; the pool treats every result as
//! possibly stale and re-checks under its exclusive section before mutating.

use async_trait::async_trait;
use ember_primitives::{Address, H256, U256};
use ember_types::{BlockBody, BlockHeader};
use thiserror::Error;

/// Point-in-time account state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    /// Confirmed on-chain nonce
    pub nonce: u64,
    /// Spendable balance
    pub balance: U256,
}

/// Errors from the external state and chain accessors.
///
/// "Not found" for pruned history is expressed as `Ok(None)` on the
/// [`ChainReader`] methods, not as an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No state available for the requested root
    #[error("unknown state root: {0}")]
    UnknownRoot(H256),
    /// Backend failure
    #[error("state backend failure: {0}")]
    Backend(String),
}

/// Read-only account state keyed by state root.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Fetch the account at `address` as of `state_root`.
    async fn account(&self, state_root: H256, address: Address)
        -> Result<AccountInfo, ProviderError>;
}

/// Read-only block history, queried by hash and number.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetch a header; `Ok(None)` when history is unavailable.
    async fn header(&self, hash: H256, number: u64)
        -> Result<Option<BlockHeader>, ProviderError>;

    /// Fetch a body; `Ok(None)` when history is unavailable or pruned.
    async fn body(&self, hash: H256, number: u64) -> Result<Option<BlockBody>, ProviderError>;
}

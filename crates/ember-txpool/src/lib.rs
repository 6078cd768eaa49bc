//! # ember-txpool
//!
//! Transaction admission and ordering for Ember.
//!
//! The pool receives candidate transactions from peers or local submitters,
//! validates them against current chain state, keeps them nonce-ordered per
//! account, ranks them globally by gas price, and reshuffles its contents
//! whenever the canonical head changes.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------+
//! |          TxPool           |  admission / reorg / truncation
//! +---------------------------+
//!    |            |         |
//! +--------+--------+  +----------+  +-------------+
//! | pending| queued |  | priced   |  | journal     |
//! | (per-account    |  | min-heap |  | (local txs) |
//! |  TxSortedMap)   |  +----------+  +-------------+
//! +-----------------+
//!         |
//! +---------------------------+
//! |  lookup: hash -> pooled   |  membership source of truth
//! +---------------------------+
//! ```
//!
//! Pending holds the gap-free, affordable run from each account's confirmed
//! nonce; queued holds everything else. The priced heap finds the cheapest
//! victims when the pool is full; exempt ("local") senders bypass price
//! floors and eviction and are journaled to disk for restart recovery.
//!
//! ## Usage
//!
//! ```ignore
//! use ember_txpool::{PoolConfig, TxPool};
//!
//! let pool = TxPool::new(config, state, chain, head).await;
//! let outcome = pool.add_remote_txs(txs).await;
//! let batch = pool.pending_batch().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod journal;
mod pending;
mod pool;
mod priced;
mod provider;
mod sorted;
mod tx;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use journal::{Journal, JournalError};
pub use pending::PendingBatch;
pub use pool::{PoolStats, SubmitOutcome, TxPool};
pub use priced::TxPricedList;
pub use provider::{AccountInfo, ChainReader, ProviderError, StateReader};
pub use sorted::{PushOutcome, TxSortedMap};
pub use tx::{intrinsic_gas, PooledTransaction, TX_SLOT_SIZE};

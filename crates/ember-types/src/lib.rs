//! # ember-types
//!
//! Core chain types for Ember: the signed transfer transaction with its RLP
//! codec, and the block header/body shapes the transaction pool consumes
//! when the canonical head changes.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod error;
mod transaction;

pub use block::{Block, BlockBody, BlockHeader};
pub use error::TypeError;
pub use transaction::{SignedTransaction, TxMessage};

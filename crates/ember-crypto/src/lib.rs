//! # ember-crypto
//!
//! Keccak-256 hashing and secp256k1 ECDSA for Ember.
//!
//! The transaction pool only consumes [`recover`]: a black box that turns a
//! signed payload back into its signer address. [`sign`] is the matching
//! producer, used by wallets and by tests that need valid transactions.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{public_key_to_address, recover, sign, PrivateKey, PublicKey, Signature};

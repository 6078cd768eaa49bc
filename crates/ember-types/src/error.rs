//! Type-layer error types

use thiserror::Error;

/// Errors from decoding or recovering transactions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// RLP decoding failed
    #[error("rlp decoding failed: {0}")]
    Rlp(#[from] rlp::DecoderError),
    /// Signature recovery failed
    #[error(transparent)]
    Crypto(#[from] ember_crypto::CryptoError),
    /// The transaction carries no usable signature
    #[error("transaction is not signed")]
    NotSigned,
}

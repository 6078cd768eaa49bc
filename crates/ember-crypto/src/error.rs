//! Crypto error types

use thiserror::Error;

/// Errors from signing and recovery
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature bytes do not form a valid curve signature
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    /// Recovery id is not 0/1 (or 27/28)
    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    /// Signer recovery failed
    #[error("failed to recover signer: {0}")]
    RecoveryFailed(String),
    /// Signing failed
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

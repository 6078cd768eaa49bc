//! Pool error types.
//!
//! Every admission failure is a per-transaction value; nothing here aborts a
//! batch. Provider failures surface through [`PoolError::Provider`] so a
//! request-driven submitter can retry.

use crate::provider::ProviderError;
use ember_primitives::{H256, U256};
use thiserror::Error;

/// Reasons a transaction is rejected or a pool operation fails
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Serialized size exceeds the configured maximum
    #[error("transaction too large: {size} bytes, max {max}")]
    Oversized {
        /// Serialized size
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Missing or unrecoverable signature
    #[error("invalid signature")]
    InvalidSignature,

    /// Gas limit exceeds the current block gas ceiling
    #[error("gas limit {gas_limit} exceeds block gas ceiling {ceiling}")]
    GasCeilingExceeded {
        /// Transaction gas limit
        gas_limit: u64,
        /// Block gas ceiling
        ceiling: u64,
    },

    /// Gas price below the configured minimum (non-local senders only)
    #[error("gas price too low: {price} < {limit}")]
    Underpriced {
        /// Offered price
        price: u128,
        /// Configured floor
        limit: u128,
    },

    /// Nonce below the sender's confirmed on-chain nonce
    #[error("nonce too low: tx {tx}, account {current}")]
    NonceTooLow {
        /// Confirmed account nonce
        current: u64,
        /// Transaction nonce
        tx: u64,
    },

    /// Balance cannot cover value + gas price * gas limit
    #[error("insufficient balance: cost {cost}, balance {balance}")]
    InsufficientBalance {
        /// Required balance
        cost: U256,
        /// Available balance
        balance: U256,
    },

    /// Intrinsic gas exceeds the declared gas limit or overflows
    #[error("intrinsic gas exceeds gas limit {gas_limit}")]
    IntrinsicGas {
        /// Declared gas limit
        gas_limit: u64,
    },

    /// Transaction hash already pooled
    #[error("already known: {0}")]
    Duplicate(H256),

    /// Pool is full and this transaction is not competitive enough to evict
    #[error("pool is full and transaction is underpriced")]
    Overflow,

    /// A same-nonce transaction is pooled and the price bump is insufficient
    #[error("replacement underpriced: offered {offered}, pooled {pooled}")]
    ReplacementUnderpriced {
        /// Price of the pooled transaction
        pooled: u128,
        /// Price offered by the replacement
        offered: u128,
    },

    /// External state/chain lookup failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = PoolError::NonceTooLow { current: 5, tx: 3 };
        let text = err.to_string();
        assert!(text.contains('5') && text.contains('3'));

        let err = PoolError::Underpriced {
            price: 1,
            limit: 100,
        };
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_errors_are_comparable() {
        assert_eq!(PoolError::Overflow, PoolError::Overflow);
        assert_ne!(
            PoolError::InvalidSignature,
            PoolError::Duplicate(H256::ZERO)
        );
    }
}

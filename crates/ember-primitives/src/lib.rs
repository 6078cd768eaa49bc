//! # ember-primitives
//!
//! Primitive types shared across the Ember node: 20-byte account addresses,
//! 32-byte hashes, and the scalar aliases used by the transaction layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

// Re-export primitive-types for balance arithmetic
pub use primitive_types::U256;

/// Block height type
pub type BlockNumber = u64;

/// Transaction nonce type
pub type Nonce = u64;

/// Gas amount type
pub type Gas = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_arithmetic() {
        let value = U256::from(7u64);
        let gas = U256::from(21_000u64) * U256::from(3u64);
        assert_eq!(value + gas, U256::from(63_007u64));
    }

    #[test]
    fn test_u256_no_silent_overflow() {
        let max = U256::MAX;
        assert!(max.checked_add(U256::one()).is_none());
    }
}

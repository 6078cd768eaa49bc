//! Pooled transaction wrapper with cached metadata.

use ember_primitives::{Address, H256, U256};
use ember_types::SignedTransaction;
use std::sync::Arc;

/// Bytes per capacity slot. A transaction occupies
/// `ceil(serialized size / TX_SLOT_SIZE)` slots.
pub const TX_SLOT_SIZE: usize = 32 * 1024;

/// Base intrinsic gas for a plain transfer
const INTRINSIC_GAS_TX: u64 = 21_000;
/// Base intrinsic gas for contract creation
const INTRINSIC_GAS_CREATION: u64 = 53_000;
/// Intrinsic gas per zero payload byte
const INTRINSIC_GAS_ZERO_BYTE: u64 = 4;
/// Intrinsic gas per non-zero payload byte
const INTRINSIC_GAS_NONZERO_BYTE: u64 = 16;

/// Compute the intrinsic gas of a transaction: flat base cost plus per-byte
/// payload cost. `None` when the sum overflows the gas integer range.
pub fn intrinsic_gas(tx: &SignedTransaction) -> Option<u64> {
    let base = if tx.is_creation() {
        INTRINSIC_GAS_CREATION
    } else {
        INTRINSIC_GAS_TX
    };
    let (zero, nonzero) = tx
        .payload()
        .iter()
        .fold((0u64, 0u64), |(zero, nonzero), byte| {
            if *byte == 0 {
                (zero + 1, nonzero)
            } else {
                (zero, nonzero + 1)
            }
        });
    base.checked_add(zero.checked_mul(INTRINSIC_GAS_ZERO_BYTE)?)?
        .checked_add(nonzero.checked_mul(INTRINSIC_GAS_NONZERO_BYTE)?)
}

/// A transaction held by the pool, with its identity and accounting data
/// computed once at admission.
///
/// Cheap to clone: the transaction body is shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct PooledTransaction {
    tx: Arc<SignedTransaction>,
    hash: H256,
    sender: Address,
    size: usize,
    seq: u64,
}

impl PooledTransaction {
    /// Wrap a transaction whose sender has already been recovered.
    ///
    /// `seq` is the pool-assigned arrival sequence, used as the stable
    /// tie-break for equal gas prices.
    pub fn new(tx: SignedTransaction, sender: Address, seq: u64) -> Self {
        let hash = tx.hash();
        let size = tx.size();
        Self {
            tx: Arc::new(tx),
            hash,
            sender,
            size,
            seq,
        }
    }

    /// The wrapped transaction.
    pub fn tx(&self) -> &SignedTransaction {
        &self.tx
    }

    /// Cached content hash.
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Cached sender address.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Cached serialized size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Arrival sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Capacity slots this transaction occupies.
    pub fn slots(&self) -> u64 {
        self.size.div_ceil(TX_SLOT_SIZE) as u64
    }

    /// Transaction nonce.
    pub fn nonce(&self) -> u64 {
        self.tx.nonce()
    }

    /// Offered gas price.
    pub fn gas_price(&self) -> u128 {
        self.tx.gas_price()
    }

    /// Declared gas limit.
    pub fn gas_limit(&self) -> u64 {
        self.tx.gas_limit()
    }

    /// Maximum balance this transaction can consume.
    pub fn cost(&self) -> U256 {
        self.tx.cost()
    }
}

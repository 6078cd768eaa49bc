//! Pool configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::tx::TX_SLOT_SIZE;

/// Pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum serialized transaction size in bytes
    pub tx_max_size: usize,
    /// Minimum gas price for admission; waived for local senders
    pub price_limit: u128,
    /// Minimum percentage price increase to replace a same-nonce transaction
    pub price_bump: u64,
    /// Per-account pending slot cap
    pub account_slots: u64,
    /// Global pending slot cap
    pub global_slots: u64,
    /// Per-account queued transaction cap, in entries
    pub account_queue: u64,
    /// Global queued slot cap
    pub global_queue: u64,
    /// Block gas limit used to validate incoming transactions
    pub block_gas_limit: u64,
    /// How long a queued account may stay idle before its queue is dropped
    pub lifetime: Duration,
    /// Interval between idle-queue sweeps
    pub sweep_interval: Duration,
    /// Interval between journal rotations
    pub rejournal_interval: Duration,
    /// Journal file path; `None` disables local-transaction persistence
    pub journal: Option<PathBuf>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            tx_max_size: 4 * TX_SLOT_SIZE,
            price_limit: 1,
            price_bump: 10,
            account_slots: 16,
            global_slots: 4096,
            account_queue: 64,
            global_queue: 1024,
            block_gas_limit: 30_000_000,
            lifetime: Duration::from_secs(3 * 3600),
            sweep_interval: Duration::from_secs(10),
            rejournal_interval: Duration::from_secs(3600),
            journal: None,
        }
    }
}

impl PoolConfig {
    /// Combined pending + queued slot capacity.
    pub fn capacity(&self) -> u64 {
        self.global_slots + self.global_queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.tx_max_size, 131_072);
        assert_eq!(config.price_bump, 10);
        assert_eq!(config.capacity(), 4096 + 1024);
        assert!(config.journal.is_none());
    }
}

//! Nonce-ordered per-account transaction container.

use crate::tx::PooledTransaction;
use ember_primitives::U256;
use std::collections::BTreeMap;

/// Result of a [`TxSortedMap::push`].
#[derive(Debug, Default)]
pub struct PushOutcome {
    /// Whether the transaction was inserted
    pub inserted: bool,
    /// The same-nonce transaction it replaced, if any
    pub replaced: Option<PooledTransaction>,
}

/// A nonce-indexed map of one account's transactions.
///
/// Two modes: *strict* holds the pending (gap-free, executable) run and
/// demotes the tail when anything inside the run becomes invalid;
/// non-strict holds the queue, where gaps are expected.
///
/// All operations are linear or logarithmic in this account's own entry
/// count, never in the global pool size.
#[derive(Debug)]
pub struct TxSortedMap {
    txs: BTreeMap<u64, PooledTransaction>,
    slots: u64,
    strict: bool,
}

impl TxSortedMap {
    /// Create an empty map. `strict` selects pending-run semantics.
    pub fn new(strict: bool) -> Self {
        Self {
            txs: BTreeMap::new(),
            slots: 0,
            strict,
        }
    }

    /// Number of transactions held.
    pub fn len(&self) -> usize {
        self.txs.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Total capacity slots of the held transactions.
    pub fn slots(&self) -> u64 {
        self.slots
    }

    /// Whether a transaction with `nonce` is held.
    pub fn contains(&self, nonce: u64) -> bool {
        self.txs.contains_key(&nonce)
    }

    /// The transaction at `nonce`, if held.
    pub fn get(&self, nonce: u64) -> Option<&PooledTransaction> {
        self.txs.get(&nonce)
    }

    /// Lowest held nonce.
    pub fn first_nonce(&self) -> Option<u64> {
        self.txs.keys().next().copied()
    }

    /// Nonce-ordered snapshot of the contents.
    pub fn to_vec(&self) -> Vec<PooledTransaction> {
        self.txs.values().cloned().collect()
    }

    /// Insert `tx`, replacing a same-nonce occupant only when the new price
    /// beats the old by at least `price_bump` percent.
    pub fn push(&mut self, tx: PooledTransaction, price_bump: u64) -> PushOutcome {
        if let Some(old) = self.txs.get(&tx.nonce()) {
            // new * 100 >= old * (100 + bump), widened so the compare
            // cannot overflow
            let offered = U256::from(tx.gas_price()) * U256::from(100u64);
            let required = U256::from(old.gas_price()) * U256::from(100 + price_bump);
            if offered < required {
                return PushOutcome {
                    inserted: false,
                    replaced: None,
                };
            }
        }
        self.slots += tx.slots();
        let replaced = self.txs.insert(tx.nonce(), tx);
        if let Some(old) = &replaced {
            self.slots -= old.slots();
        }
        PushOutcome {
            inserted: true,
            replaced,
        }
    }

    /// Remove the transaction at `nonce`.
    pub fn remove(&mut self, nonce: u64) -> Option<PooledTransaction> {
        let removed = self.txs.remove(&nonce);
        if let Some(tx) = &removed {
            self.slots -= tx.slots();
        }
        removed
    }

    /// Drop and return every entry with nonce strictly below `threshold`.
    pub fn forward(&mut self, threshold: u64) -> Vec<PooledTransaction> {
        let keep = self.txs.split_off(&threshold);
        let removed: Vec<_> = std::mem::replace(&mut self.txs, keep)
            .into_values()
            .collect();
        for tx in &removed {
            self.slots -= tx.slots();
        }
        removed
    }

    /// Drop entries that can no longer execute: gas limit above `gas_ceiling`,
    /// or cumulative cost (summed over kept entries in nonce order) above
    /// `balance`.
    ///
    /// Returns `(removed, demoted)`. In strict mode every entry after the
    /// first violation leaves the map; the violations come back as `removed`,
    /// the merely-orphaned tail as `demoted` for the caller to re-queue.
    pub fn filter(
        &mut self,
        balance: U256,
        gas_ceiling: u64,
    ) -> (Vec<PooledTransaction>, Vec<PooledTransaction>) {
        let mut removed = Vec::new();
        let mut demoted = Vec::new();
        let mut spent = U256::zero();
        let mut first_violation: Option<u64> = None;

        let mut drop_nonces = Vec::new();
        for (nonce, tx) in self.txs.iter() {
            let cost = tx.cost();
            let violates = tx.gas_limit() > gas_ceiling
                || spent.checked_add(cost).map(|total| total > balance).unwrap_or(true);
            if violates {
                drop_nonces.push(*nonce);
                if first_violation.is_none() {
                    first_violation = Some(*nonce);
                }
            } else {
                spent += cost;
            }
        }
        for nonce in drop_nonces {
            if let Some(tx) = self.remove(nonce) {
                removed.push(tx);
            }
        }

        if self.strict {
            if let Some(lowest) = first_violation {
                let tail: Vec<u64> = self.txs.range(lowest..).map(|(n, _)| *n).collect();
                for nonce in tail {
                    if let Some(tx) = self.remove(nonce) {
                        demoted.push(tx);
                    }
                }
            }
        }

        (removed, demoted)
    }

    /// Starting at `start`, remove and return the maximal run of consecutive
    /// nonces present in the map.
    pub fn ready(&mut self, start: u64) -> Vec<PooledTransaction> {
        let mut out = Vec::new();
        let mut next = start;
        while let Some(tx) = self.remove(next) {
            out.push(tx);
            next += 1;
        }
        out
    }

    /// Trim to at most `limit` entries, removing the highest nonces first.
    pub fn resize(&mut self, limit: usize) -> Vec<PooledTransaction> {
        let mut removed = Vec::new();
        while self.txs.len() > limit {
            // pop_last is the highest nonce
            if let Some((_, tx)) = self.txs.pop_last() {
                self.slots -= tx.slots();
                removed.push(tx);
            }
        }
        removed
    }

    /// Empty the map, returning everything held.
    pub fn clear(&mut self) -> Vec<PooledTransaction> {
        self.slots = 0;
        std::mem::take(&mut self.txs).into_values().collect()
    }
}

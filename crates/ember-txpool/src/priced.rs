//! Price-ordered index over all evictable pooled transactions.

use crate::tx::PooledTransaction;
use dashmap::DashMap;
use ember_primitives::{Address, H256};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// Heap entry. Ordering is `(gas price, arrival sequence)` ascending; the
/// arrival sequence breaks ties between equal prices and is stable within
/// one process run.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct PricedEntry {
    price: u128,
    seq: u64,
    hash: H256,
}

/// Min-heap over every non-local pooled transaction, ordered by gas price.
///
/// The index is advisory: removals through other paths (reorgs, container
/// eviction, replacement) only report a count via [`TxPricedList::removed`],
/// leaving stale entries behind. Stale entries are skipped lazily on pop,
/// and the whole heap is rebuilt from the live lookup once they exceed a
/// quarter of it, bounding the drift.
pub struct TxPricedList {
    heap: BinaryHeap<Reverse<PricedEntry>>,
    stale: usize,
}

impl TxPricedList {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            stale: 0,
        }
    }

    /// Estimated number of live entries.
    pub fn len(&self) -> usize {
        self.heap.len().saturating_sub(self.stale)
    }

    /// Whether no live entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Track a newly admitted non-local transaction.
    pub fn insert(&mut self, tx: &PooledTransaction) {
        self.heap.push(Reverse(PricedEntry {
            price: tx.gas_price(),
            seq: tx.seq(),
            hash: tx.hash(),
        }));
    }

    /// Whether `tx` is priced at or below the cheapest tracked transaction,
    /// i.e. evicting on its behalf could never make room.
    pub fn underpriced(
        &mut self,
        tx: &PooledTransaction,
        lookup: &DashMap<H256, PooledTransaction>,
        locals: &HashSet<Address>,
    ) -> bool {
        loop {
            let Some(Reverse(head)) = self.heap.peek() else {
                return false;
            };
            if Self::live(head, lookup, locals).is_some() {
                return tx.gas_price() <= head.price;
            }
            let _ = self.heap.pop();
            self.stale = self.stale.saturating_sub(1);
        }
    }

    /// Remove the cheapest transactions until at least `slots_needed` slots
    /// are freed.
    ///
    /// Non-forced discards refuse to evict anything priced at or above
    /// `price_floor` (the triggering transaction's price). When not enough
    /// room can be freed, nothing is evicted: tentatively popped entries are
    /// reinstated and the call reports failure.
    pub fn discard(
        &mut self,
        slots_needed: u64,
        force: bool,
        price_floor: u128,
        lookup: &DashMap<H256, PooledTransaction>,
        locals: &HashSet<Address>,
    ) -> (Vec<PooledTransaction>, bool) {
        let mut freed = 0u64;
        let mut victims: Vec<(PricedEntry, PooledTransaction)> = Vec::new();

        while freed < slots_needed {
            let Some(Reverse(entry)) = self.heap.pop() else {
                break;
            };
            let Some(tx) = Self::live(&entry, lookup, locals) else {
                self.stale = self.stale.saturating_sub(1);
                continue;
            };
            if !force && entry.price >= price_floor {
                self.heap.push(Reverse(entry));
                break;
            }
            freed += tx.slots();
            victims.push((entry, tx));
        }

        if freed < slots_needed {
            for (entry, _) in victims {
                self.heap.push(Reverse(entry));
            }
            return (Vec::new(), false);
        }
        (victims.into_iter().map(|(_, tx)| tx).collect(), true)
    }

    /// Report `count` transactions removed through another path. Rebuilds
    /// the heap once stale entries pass a quarter of its size.
    pub fn removed(
        &mut self,
        count: usize,
        lookup: &DashMap<H256, PooledTransaction>,
        locals: &HashSet<Address>,
    ) {
        self.stale += count;
        if self.stale * 4 > self.heap.len() {
            self.reheap(lookup, locals);
        }
    }

    /// Rebuild the heap from the live lookup, dropping every stale entry.
    pub fn reheap(
        &mut self,
        lookup: &DashMap<H256, PooledTransaction>,
        locals: &HashSet<Address>,
    ) {
        self.heap.clear();
        self.stale = 0;
        for item in lookup.iter() {
            let tx = item.value();
            if !locals.contains(&tx.sender()) {
                self.heap.push(Reverse(PricedEntry {
                    price: tx.gas_price(),
                    seq: tx.seq(),
                    hash: tx.hash(),
                }));
            }
        }
    }

    fn live(
        entry: &PricedEntry,
        lookup: &DashMap<H256, PooledTransaction>,
        locals: &HashSet<Address>,
    ) -> Option<PooledTransaction> {
        let tx = lookup.get(&entry.hash)?.value().clone();
        if locals.contains(&tx.sender()) {
            return None;
        }
        Some(tx)
    }
}

impl Default for TxPricedList {
    fn default() -> Self {
        Self::new()
    }
}

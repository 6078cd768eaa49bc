//! Price-sorted view over executable transactions, one lane per sender.

use crate::tx::PooledTransaction;
use ember_primitives::Address;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// Heap entry describing the current head of one sender's lane. Max-heap by
/// gas price, earliest arrival first on ties.
#[derive(PartialEq, Eq)]
struct LaneHead {
    price: u128,
    seq: u64,
    sender: Address,
}

impl Ord for LaneHead {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            .then_with(|| other.seq.cmp(&self.seq))
            .then_with(|| self.sender.cmp(&other.sender))
    }
}

impl PartialOrd for LaneHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Consumable batch of executable transactions.
///
/// Each sender contributes a nonce-ordered lane; across lanes the batch
/// yields the best-priced current head. Nonce order within a lane always
/// wins over price, so a sender's cheap nonce-N transaction is delivered
/// before their expensive nonce-N+1 one.
///
/// The batch is a snapshot: it is built from the pool under lock and then
/// consumed without further coordination.
pub struct PendingBatch {
    heap: BinaryHeap<LaneHead>,
    lanes: HashMap<Address, VecDeque<PooledTransaction>>,
}

impl PendingBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            lanes: HashMap::new(),
        }
    }

    /// Add one sender's nonce-ordered executable transactions.
    pub fn push(&mut self, sender: Address, txs: Vec<PooledTransaction>) {
        let Some(head) = txs.first() else { return };
        self.heap.push(LaneHead {
            price: head.gas_price(),
            seq: head.seq(),
            sender,
        });
        self.lanes.insert(sender, txs.into());
    }

    /// The best-priced transaction currently at the front of any lane.
    pub fn peek(&self) -> Option<&PooledTransaction> {
        let head = self.heap.peek()?;
        self.lanes.get(&head.sender)?.front()
    }

    /// Consume the current best transaction and advance its sender's lane.
    pub fn shift(&mut self) -> Option<PooledTransaction> {
        let head = self.heap.pop()?;
        let lane = self.lanes.get_mut(&head.sender)?;
        let tx = lane.pop_front()?;
        match lane.front() {
            Some(next) => self.heap.push(LaneHead {
                price: next.gas_price(),
                seq: next.seq(),
                sender: head.sender,
            }),
            None => {
                self.lanes.remove(&head.sender);
            }
        }
        Some(tx)
    }

    /// Drop the current best transaction and the remainder of its sender's
    /// lane. Used when a transaction cannot execute, which makes every
    /// higher nonce from the same sender unusable too.
    pub fn pop(&mut self) -> Option<PooledTransaction> {
        let head = self.heap.pop()?;
        let mut lane = self.lanes.remove(&head.sender)?;
        lane.pop_front()
    }

    /// Number of transactions remaining across all lanes.
    pub fn len(&self) -> usize {
        self.lanes.values().map(VecDeque::len).sum()
    }

    /// Whether the batch is exhausted.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

impl Default for PendingBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for PendingBatch {
    type Item = PooledTransaction;

    fn next(&mut self) -> Option<Self::Item> {
        self.shift()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ember_crypto::Signature;
    use ember_primitives::U256;
    use ember_types::TxMessage;

    fn tx(sender: Address, nonce: u64, gas_price: u128, seq: u64) -> PooledTransaction {
        let signed = TxMessage {
            nonce,
            gas_price,
            gas_limit: 21_000,
            to: Some(Address::from_bytes([0x42; 20])),
            value: U256::zero(),
            payload: Bytes::new(),
        }
        .into_signed(Signature::new([1; 32], [2; 32], 27));
        PooledTransaction::new(signed, sender, seq)
    }

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_price_descending_across_senders() {
        let mut batch = PendingBatch::new();
        batch.push(addr(1), vec![tx(addr(1), 0, 10, 0)]);
        batch.push(addr(2), vec![tx(addr(2), 0, 30, 1)]);
        batch.push(addr(3), vec![tx(addr(3), 0, 20, 2)]);

        let prices: Vec<u128> = batch.map(|t| t.gas_price()).collect();
        assert_eq!(prices, vec![30, 20, 10]);
    }

    #[test]
    fn test_nonce_order_beats_price_within_sender() {
        let a = addr(1);
        let mut batch = PendingBatch::new();
        // nonce 0 is cheap, nonce 1 expensive: 0 must still come first
        batch.push(a, vec![tx(a, 0, 1, 0), tx(a, 1, 100, 1)]);
        batch.push(addr(2), vec![tx(addr(2), 0, 50, 2)]);

        let order: Vec<(Address, u64)> = batch.map(|t| (t.sender(), t.nonce())).collect();
        assert_eq!(order, vec![(addr(2), 0), (a, 0), (a, 1)]);
    }

    #[test]
    fn test_shift_requeues_next_lane_head() {
        let a = addr(1);
        let mut batch = PendingBatch::new();
        batch.push(a, vec![tx(a, 0, 40, 0), tx(a, 1, 40, 1)]);
        batch.push(addr(2), vec![tx(addr(2), 0, 30, 2)]);

        assert_eq!(batch.shift().unwrap().nonce(), 0);
        // the sender's nonce-1 tx outprices the other lane and comes next
        assert_eq!(batch.shift().unwrap().sender(), a);
        assert_eq!(batch.shift().unwrap().sender(), addr(2));
        assert!(batch.shift().is_none());
    }

    #[test]
    fn test_pop_drops_whole_lane() {
        let a = addr(1);
        let mut batch = PendingBatch::new();
        batch.push(a, vec![tx(a, 0, 40, 0), tx(a, 1, 40, 1), tx(a, 2, 40, 2)]);
        batch.push(addr(2), vec![tx(addr(2), 0, 10, 3)]);

        let dropped = batch.pop().unwrap();
        assert_eq!(dropped.sender(), a);
        // the rest of that lane is gone
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.shift().unwrap().sender(), addr(2));
    }

    #[test]
    fn test_equal_price_yields_earliest_arrival() {
        let mut batch = PendingBatch::new();
        batch.push(addr(1), vec![tx(addr(1), 0, 10, 5)]);
        batch.push(addr(2), vec![tx(addr(2), 0, 10, 2)]);

        assert_eq!(batch.shift().unwrap().seq(), 2);
        assert_eq!(batch.shift().unwrap().seq(), 5);
    }

    #[test]
    fn test_empty_lane_ignored() {
        let mut batch = PendingBatch::new();
        batch.push(addr(1), Vec::new());
        assert!(batch.is_empty());
        assert!(batch.peek().is_none());
    }
}

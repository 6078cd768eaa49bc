//! Pool orchestration: admission, head tracking, truncation, introspection.

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::journal::{Journal, JournalError};
use crate::pending::PendingBatch;
use crate::priced::TxPricedList;
use crate::provider::{AccountInfo, ChainReader, ProviderError, StateReader};
use crate::sorted::TxSortedMap;
use crate::tx::{intrinsic_gas, PooledTransaction};
use dashmap::DashMap;
use ember_primitives::{Address, H256};
use ember_types::{Block, BlockHeader, SignedTransaction};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Reorgs deeper than this skip transaction reinjection.
const MAX_REORG_DEPTH: u64 = 64;

/// Where a submission came from. Origin decides price-floor exemption,
/// journaling and local marking.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TxOrigin {
    /// Gossip from peers. Full validation, evictable.
    Remote,
    /// Submitted through this node. Floor-exempt, journaled, never evicted.
    Local,
    /// Journal replay at startup. Local semantics without re-journaling.
    Replay,
    /// Unwound by a reorg. Floor-exempt but otherwise remote.
    Reinject,
}

impl TxOrigin {
    fn is_local(self) -> bool {
        matches!(self, TxOrigin::Local | TxOrigin::Replay)
    }

    fn floor_exempt(self) -> bool {
        !matches!(self, TxOrigin::Remote)
    }
}

/// Per-sender containers.
struct PoolAccount {
    /// Gap-free executable run starting at the confirmed nonce.
    pending: TxSortedMap,
    /// Future or currently unaffordable transactions.
    queue: TxSortedMap,
    /// Last submission or promotion touching this account.
    last_activity: Instant,
}

impl PoolAccount {
    fn new(now: Instant) -> Self {
        Self {
            pending: TxSortedMap::new(true),
            queue: TxSortedMap::new(false),
            last_activity: now,
        }
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.queue.is_empty()
    }
}

/// State behind the exclusive section.
struct PoolInner {
    accounts: HashMap<Address, PoolAccount>,
    locals: HashSet<Address>,
    priced: TxPricedList,
    head: BlockHeader,
    next_seq: u64,
}

impl PoolInner {
    fn pending_slots(&self) -> u64 {
        self.accounts.values().map(|a| a.pending.slots()).sum()
    }

    fn queued_slots(&self) -> u64 {
        self.accounts.values().map(|a| a.queue.slots()).sum()
    }

    fn total_slots(&self) -> u64 {
        self.pending_slots() + self.queued_slots()
    }
}

/// Result of one batch submission.
pub struct SubmitOutcome {
    /// Per-input admission results, in submission order.
    pub results: Vec<PoolResult<()>>,
    /// Transactions that became executable during this submission,
    /// including queued ones pulled forward by a gap fill.
    pub promoted: Vec<PooledTransaction>,
}

impl SubmitOutcome {
    /// Whether every input was admitted.
    pub fn all_accepted(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }
}

/// Point-in-time pool occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Executable transactions across all accounts
    pub pending: usize,
    /// Queued transactions across all accounts
    pub queued: usize,
    /// Slots in use
    pub slots: u64,
    /// Configured slot capacity
    pub capacity: u64,
}

/// The transaction pool.
///
/// All mutation funnels through one async `RwLock`; readers that only need
/// membership go through the lock-free lookup. Mutating operations hold the
/// write guard across their state fetches, so observers never see a
/// half-applied head switch.
pub struct TxPool {
    config: PoolConfig,
    state: Arc<dyn StateReader>,
    chain: Arc<dyn ChainReader>,
    lookup: DashMap<H256, PooledTransaction>,
    inner: RwLock<PoolInner>,
    journal: Option<Journal>,
    shutdown: watch::Sender<bool>,
}

impl TxPool {
    /// Build a pool tracking `head` and replay the journal if one is
    /// configured. Journal problems are logged, never fatal.
    pub async fn new(
        config: PoolConfig,
        state: Arc<dyn StateReader>,
        chain: Arc<dyn ChainReader>,
        head: BlockHeader,
    ) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        let journal = config.journal.clone().map(Journal::new);
        let pool = Arc::new(Self {
            config,
            state,
            chain,
            lookup: DashMap::new(),
            inner: RwLock::new(PoolInner {
                accounts: HashMap::new(),
                locals: HashSet::new(),
                priced: TxPricedList::new(),
                head,
                next_seq: 0,
            }),
            journal,
            shutdown,
        });

        if let Some(journal) = &pool.journal {
            match journal.load() {
                Ok(txs) if !txs.is_empty() => {
                    info!(count = txs.len(), "replaying local transaction journal");
                    let outcome = pool.add_txs(txs, TxOrigin::Replay).await;
                    let dropped = outcome.results.iter().filter(|r| r.is_err()).count();
                    if dropped > 0 {
                        debug!(dropped, "journaled transactions no longer admissible");
                    }
                    if let Err(err) = pool.rotate_journal().await {
                        warn!(error = %err, "initial journal rotation failed");
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "journal replay failed"),
            }
        }
        pool
    }

    /// The active configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Submit peer-gossiped transactions.
    pub async fn add_remote_txs(&self, txs: Vec<SignedTransaction>) -> SubmitOutcome {
        self.add_txs(txs, TxOrigin::Remote).await
    }

    /// Submit transactions from this node's own users. Their senders become
    /// exempt from price floors and eviction, and the transactions are
    /// journaled for restart recovery.
    pub async fn add_local_txs(&self, txs: Vec<SignedTransaction>) -> SubmitOutcome {
        self.add_txs(txs, TxOrigin::Local).await
    }

    async fn add_txs(&self, txs: Vec<SignedTransaction>, origin: TxOrigin) -> SubmitOutcome {
        let mut results: Vec<PoolResult<()>> = Vec::with_capacity(txs.len());
        let mut prepared: Vec<(usize, SignedTransaction, Address)> = Vec::new();

        // stateless screening before any lock is taken
        for tx in txs {
            let idx = results.len();
            if tx.size() > self.config.tx_max_size {
                results.push(Err(PoolError::Oversized {
                    size: tx.size(),
                    max: self.config.tx_max_size,
                }));
                continue;
            }
            if !tx.is_signed() {
                results.push(Err(PoolError::InvalidSignature));
                continue;
            }
            let Ok(sender) = tx.recover_sender() else {
                results.push(Err(PoolError::InvalidSignature));
                continue;
            };
            if self.lookup.contains_key(&tx.hash()) {
                results.push(Err(PoolError::Duplicate(tx.hash())));
                continue;
            }
            results.push(Ok(()));
            prepared.push((idx, tx, sender));
        }
        if prepared.is_empty() {
            return SubmitOutcome {
                results,
                promoted: Vec::new(),
            };
        }

        // prefetch sender state outside the exclusive section
        let root = self.inner.read().await.head.state_root;
        let senders: HashSet<Address> = prepared.iter().map(|(_, _, s)| *s).collect();
        let mut states = self.fetch_states(root, &senders).await;

        let mut inner = self.inner.write().await;
        if inner.head.state_root != root {
            // the head moved while we were prefetching
            states = self.fetch_states(inner.head.state_root, &senders).await;
        }

        let mut dirty: HashSet<Address> = HashSet::new();
        let mut promoted = Vec::new();
        for (idx, tx, sender) in prepared {
            let info = match states.get(&sender) {
                Some(Ok(info)) => *info,
                Some(Err(err)) => {
                    results[idx] = Err(PoolError::Provider(err.clone()));
                    continue;
                }
                None => continue,
            };
            match self.admit(&mut inner, tx, sender, info, origin) {
                Ok(direct) => {
                    dirty.insert(sender);
                    // a transaction landing straight in pending is already
                    // executable and counts as newly ready
                    promoted.extend(direct);
                }
                Err(err) => results[idx] = Err(err),
            }
        }

        let ok_states: HashMap<Address, AccountInfo> = states
            .iter()
            .filter_map(|(addr, res)| res.as_ref().ok().map(|info| (*addr, *info)))
            .collect();
        let dirty: Vec<Address> = dirty.into_iter().collect();
        promoted.extend(self.promote(&mut inner, &dirty, &ok_states));
        self.truncate_pending(&mut inner);
        self.truncate_queue(&mut inner);

        SubmitOutcome { results, promoted }
    }

    /// Validate and place one prepared transaction. Caller holds the guard.
    /// Returns the transaction when it went straight into pending.
    fn admit(
        &self,
        inner: &mut PoolInner,
        tx: SignedTransaction,
        sender: Address,
        info: AccountInfo,
        origin: TxOrigin,
    ) -> PoolResult<Option<PooledTransaction>> {
        let hash = tx.hash();
        if self.lookup.contains_key(&hash) {
            return Err(PoolError::Duplicate(hash));
        }
        let local = origin.is_local() || inner.locals.contains(&sender);

        if tx.gas_limit() > self.config.block_gas_limit {
            return Err(PoolError::GasCeilingExceeded {
                gas_limit: tx.gas_limit(),
                ceiling: self.config.block_gas_limit,
            });
        }
        if !local && !origin.floor_exempt() && tx.gas_price() < self.config.price_limit {
            return Err(PoolError::Underpriced {
                price: tx.gas_price(),
                limit: self.config.price_limit,
            });
        }
        if tx.nonce() < info.nonce {
            return Err(PoolError::NonceTooLow {
                current: info.nonce,
                tx: tx.nonce(),
            });
        }
        let cost = tx.cost();
        if cost > info.balance {
            return Err(PoolError::InsufficientBalance {
                cost,
                balance: info.balance,
            });
        }
        match intrinsic_gas(&tx) {
            Some(gas) if gas <= tx.gas_limit() => {}
            _ => {
                return Err(PoolError::IntrinsicGas {
                    gas_limit: tx.gas_limit(),
                });
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let pooled = PooledTransaction::new(tx, sender, seq);

        // make room, cheapest victims first
        if !local {
            let total = inner.total_slots();
            if total + pooled.slots() > self.config.capacity() {
                if inner
                    .priced
                    .underpriced(&pooled, &self.lookup, &inner.locals)
                {
                    return Err(PoolError::Overflow);
                }
                let needed = total + pooled.slots() - self.config.capacity();
                let (victims, ok) = inner.priced.discard(
                    needed,
                    false,
                    pooled.gas_price(),
                    &self.lookup,
                    &inner.locals,
                );
                if !ok {
                    return Err(PoolError::Overflow);
                }
                debug!(count = victims.len(), "evicting underpriced transactions");
                for victim in victims {
                    self.remove_pooled(inner, &victim);
                }
            }
        }

        let journal_copy = pooled.clone();
        let direct = self.place(inner, pooled, local, info)?;

        if origin == TxOrigin::Local || origin == TxOrigin::Replay {
            inner.locals.insert(sender);
        }
        // any exempt-sender submission is journaled, whichever path it
        // arrived on; replay is already reading the journal
        if local && origin != TxOrigin::Replay {
            if let Some(journal) = &self.journal {
                if let Err(err) = journal.insert(journal_copy.tx()) {
                    warn!(error = %err, hash = %journal_copy.hash(), "journal append failed");
                }
            }
        }
        Ok(direct.then_some(journal_copy))
    }

    /// Insert into pending when the nonce lands on the executable run,
    /// otherwise into the queue. Same-nonce occupants go through the price
    /// bump rule. Returns whether the transaction went into pending.
    fn place(
        &self,
        inner: &mut PoolInner,
        pooled: PooledTransaction,
        local: bool,
        info: AccountInfo,
    ) -> PoolResult<bool> {
        let sender = pooled.sender();
        let nonce = pooled.nonce();
        let hash = pooled.hash();
        let now = Instant::now();
        let queue_cap = self.config.account_queue as usize;

        let replaced;
        let overflowed;
        let to_pending;
        {
            let account = inner
                .accounts
                .entry(sender)
                .or_insert_with(|| PoolAccount::new(now));
            account.last_activity = now;

            let next = info.nonce + account.pending.len() as u64;
            to_pending = account.pending.contains(nonce) || nonce == next;
            let map = if to_pending {
                &mut account.pending
            } else {
                &mut account.queue
            };
            let prior = map.get(nonce).map(|t| t.gas_price());
            let outcome = map.push(pooled.clone(), self.config.price_bump);
            if !outcome.inserted {
                return Err(PoolError::ReplacementUnderpriced {
                    pooled: prior.unwrap_or_default(),
                    offered: pooled.gas_price(),
                });
            }
            replaced = outcome.replaced;
            overflowed = if !to_pending && !local && account.queue.len() > queue_cap {
                account.queue.resize(queue_cap)
            } else {
                Vec::new()
            };
        }

        let mut stale = 0usize;
        if let Some(old) = replaced {
            self.lookup.remove(&old.hash());
            stale += 1;
        }
        let mut dropped_self = false;
        for tx in overflowed {
            if tx.hash() == hash {
                dropped_self = true;
            }
            self.lookup.remove(&tx.hash());
            stale += 1;
        }
        if stale > 0 {
            inner.priced.removed(stale, &self.lookup, &inner.locals);
        }
        if dropped_self {
            return Err(PoolError::Overflow);
        }

        self.lookup.insert(hash, pooled.clone());
        if !local {
            inner.priced.insert(&pooled);
        }
        Ok(to_pending)
    }

    /// Remove one transaction from its sender's containers and the lookup.
    /// Pending entries above the removed nonce fall back to the queue so
    /// the executable run stays gap-free.
    fn remove_pooled(&self, inner: &mut PoolInner, victim: &PooledTransaction) {
        self.lookup.remove(&victim.hash());
        let Some(account) = inner.accounts.get_mut(&victim.sender()) else {
            return;
        };
        if account.pending.remove(victim.nonce()).is_some() {
            let tail: Vec<PooledTransaction> = account
                .pending
                .to_vec()
                .into_iter()
                .filter(|t| t.nonce() > victim.nonce())
                .collect();
            for tx in tail {
                account.pending.remove(tx.nonce());
                account.queue.push(tx, 0);
            }
        } else {
            account.queue.remove(victim.nonce());
        }
        if account.is_empty() {
            inner.accounts.remove(&victim.sender());
        }
    }

    /// Pull newly executable transactions out of the queues of `addrs`.
    fn promote(
        &self,
        inner: &mut PoolInner,
        addrs: &[Address],
        states: &HashMap<Address, AccountInfo>,
    ) -> Vec<PooledTransaction> {
        let mut promoted = Vec::new();
        let mut stale = 0usize;
        for addr in addrs {
            let Some(info) = states.get(addr) else { continue };
            let local = inner.locals.contains(addr);
            let Some(account) = inner.accounts.get_mut(addr) else {
                continue;
            };

            let mut removed = account.pending.forward(info.nonce);
            removed.extend(account.queue.forward(info.nonce));
            let (unpayable, _) = account.queue.filter(info.balance, self.config.block_gas_limit);
            removed.extend(unpayable);

            let next = info.nonce + account.pending.len() as u64;
            for tx in account.queue.ready(next) {
                account.pending.push(tx.clone(), 0);
                promoted.push(tx);
            }
            if !local && account.queue.len() as u64 > self.config.account_queue {
                removed.extend(account.queue.resize(self.config.account_queue as usize));
            }
            let prune = account.is_empty();
            if prune {
                inner.accounts.remove(addr);
            }
            for tx in &removed {
                self.lookup.remove(&tx.hash());
            }
            stale += removed.len();
        }
        if stale > 0 {
            inner.priced.removed(stale, &self.lookup, &inner.locals);
        }
        promoted
    }

    /// Rerun executability checks against fresh state, moving stranded
    /// pending transactions back to the queue and dropping mined or
    /// unpayable ones.
    fn demote(&self, inner: &mut PoolInner, states: &HashMap<Address, AccountInfo>) {
        let addrs: Vec<Address> = inner.accounts.keys().copied().collect();
        let mut stale = 0usize;
        for addr in addrs {
            let Some(info) = states.get(&addr) else { continue };
            let Some(account) = inner.accounts.get_mut(&addr) else {
                continue;
            };

            let mut removed = account.pending.forward(info.nonce);
            removed.extend(account.queue.forward(info.nonce));

            let (unpayable, orphaned) =
                account.pending.filter(info.balance, self.config.block_gas_limit);
            removed.extend(unpayable);
            for tx in orphaned {
                let outcome = account.queue.push(tx.clone(), 0);
                if !outcome.inserted {
                    removed.push(tx);
                } else if let Some(old) = outcome.replaced {
                    removed.push(old);
                }
            }

            // a pending run must start at the confirmed nonce
            if let Some(first) = account.pending.first_nonce() {
                if first > info.nonce {
                    warn!(sender = %addr, "pending gap after reset, requeueing account");
                    for tx in account.pending.clear() {
                        let outcome = account.queue.push(tx.clone(), 0);
                        if !outcome.inserted {
                            removed.push(tx);
                        } else if let Some(old) = outcome.replaced {
                            removed.push(old);
                        }
                    }
                }
            }

            for tx in &removed {
                self.lookup.remove(&tx.hash());
            }
            stale += removed.len();
        }
        inner.accounts.retain(|_, account| !account.is_empty());
        if stale > 0 {
            inner.priced.removed(stale, &self.lookup, &inner.locals);
        }
    }

    /// Adopt `block` as the canonical head.
    ///
    /// On a sibling switch the old and new chains are walked back to their
    /// common ancestor; transactions mined only on the abandoned side are
    /// resubmitted. When history needed for the walk is pruned or the fork
    /// is deeper than [`MAX_REORG_DEPTH`], the head is adopted anyway and
    /// reinjection is skipped.
    pub async fn new_head(&self, block: &Block) {
        let mut inner = self.inner.write().await;
        let old = inner.head.clone();
        let header = block.header.clone();

        let mut reinject: Vec<SignedTransaction> = Vec::new();
        if old.hash() != header.parent_hash && old.hash() != header.hash() {
            match self.reorg_diff(&old, block).await {
                Ok(Some(txs)) => {
                    debug!(count = txs.len(), "reinjecting transactions from abandoned chain");
                    reinject = txs;
                }
                Ok(None) => {
                    warn!(
                        old = %old.hash(),
                        new = %header.hash(),
                        "reorg walk hit missing history, skipping reinjection"
                    );
                }
                Err(err) => {
                    warn!(error = %err, "reorg walk failed, skipping reinjection");
                }
            }
        }
        inner.head = header;

        // refresh state for every tracked account plus reinject senders
        let mut prepared: Vec<(SignedTransaction, Address)> = Vec::new();
        let mut addrs: HashSet<Address> = inner.accounts.keys().copied().collect();
        for tx in reinject {
            if self.lookup.contains_key(&tx.hash()) {
                continue;
            }
            if let Ok(sender) = tx.recover_sender() {
                addrs.insert(sender);
                prepared.push((tx, sender));
            }
        }
        let root = inner.head.state_root;
        let states = self.fetch_states(root, &addrs).await;
        let ok_states: HashMap<Address, AccountInfo> = states
            .into_iter()
            .filter_map(|(addr, res)| res.ok().map(|info| (addr, info)))
            .collect();

        self.demote(&mut inner, &ok_states);
        for (tx, sender) in prepared {
            let Some(info) = ok_states.get(&sender).copied() else {
                continue;
            };
            if let Err(err) = self.admit(&mut inner, tx, sender, info, TxOrigin::Reinject) {
                debug!(error = %err, "reinjected transaction rejected");
            }
        }
        let addrs: Vec<Address> = inner.accounts.keys().copied().collect();
        self.promote(&mut inner, &addrs, &ok_states);
        self.truncate_pending(&mut inner);
        self.truncate_queue(&mut inner);
    }

    /// Walk both chains back to their common ancestor. Returns the
    /// transactions present only on the abandoned side, or `None` when the
    /// walk cannot complete.
    async fn reorg_diff(
        &self,
        old: &BlockHeader,
        block: &Block,
    ) -> Result<Option<Vec<SignedTransaction>>, ProviderError> {
        if old.number.abs_diff(block.number()) > MAX_REORG_DEPTH {
            return Ok(None);
        }

        let new_head_hash = block.hash();
        let mut discarded: Vec<SignedTransaction> = Vec::new();
        let mut included: HashSet<H256> = HashSet::new();
        for tx in &block.body.transactions {
            included.insert(tx.hash());
        }

        let mut rem = (old.hash(), old.number, old.parent_hash);
        let mut add = (new_head_hash, block.number(), block.header.parent_hash);
        let mut steps = 0u64;
        let mut step = || {
            steps += 1;
            steps > MAX_REORG_DEPTH
        };

        while rem.1 > add.1 {
            if step() {
                return Ok(None);
            }
            let Some(body) = self.chain.body(rem.0, rem.1).await? else {
                return Ok(None);
            };
            discarded.extend(body.transactions);
            let Some(parent) = self.parent_of(rem.2, rem.1).await? else {
                return Ok(None);
            };
            rem = parent;
        }
        while add.1 > rem.1 {
            if step() {
                return Ok(None);
            }
            if add.0 != new_head_hash {
                let Some(body) = self.chain.body(add.0, add.1).await? else {
                    return Ok(None);
                };
                for tx in body.transactions {
                    included.insert(tx.hash());
                }
            }
            let Some(parent) = self.parent_of(add.2, add.1).await? else {
                return Ok(None);
            };
            add = parent;
        }
        while rem.0 != add.0 {
            if rem.1 == 0 || step() {
                return Ok(None);
            }
            let Some(body) = self.chain.body(rem.0, rem.1).await? else {
                return Ok(None);
            };
            discarded.extend(body.transactions);
            if add.0 != new_head_hash {
                let Some(body) = self.chain.body(add.0, add.1).await? else {
                    return Ok(None);
                };
                for tx in body.transactions {
                    included.insert(tx.hash());
                }
            }
            let (Some(rem_parent), Some(add_parent)) = (
                self.parent_of(rem.2, rem.1).await?,
                self.parent_of(add.2, add.1).await?,
            ) else {
                return Ok(None);
            };
            rem = rem_parent;
            add = add_parent;
        }

        Ok(Some(
            discarded
                .into_iter()
                .filter(|tx| !included.contains(&tx.hash()))
                .collect(),
        ))
    }

    async fn parent_of(
        &self,
        parent_hash: H256,
        number: u64,
    ) -> Result<Option<(H256, u64, H256)>, ProviderError> {
        if number == 0 {
            return Ok(None);
        }
        let Some(header) = self.chain.header(parent_hash, number - 1).await? else {
            return Ok(None);
        };
        Ok(Some((header.hash(), header.number, header.parent_hash)))
    }

    async fn fetch_states(
        &self,
        root: H256,
        addrs: &HashSet<Address>,
    ) -> HashMap<Address, Result<AccountInfo, ProviderError>> {
        let mut states = HashMap::with_capacity(addrs.len());
        for addr in addrs {
            states.insert(*addr, self.state.account(root, *addr).await);
        }
        states
    }

    /// Shrink pending to the global slot cap by repeatedly clipping the
    /// highest nonce off the largest account above its fair share. Local
    /// senders are exempt.
    fn truncate_pending(&self, inner: &mut PoolInner) {
        let limit = self.config.global_slots;
        let share = self.config.account_slots;
        let mut total = inner.pending_slots();
        if total <= limit {
            return;
        }
        let mut dropped = 0usize;
        while total > limit {
            let offender = inner
                .accounts
                .iter()
                .filter(|(addr, account)| {
                    !inner.locals.contains(*addr) && account.pending.slots() > share
                })
                .max_by_key(|(_, account)| account.pending.slots())
                .map(|(addr, _)| *addr);
            let Some(addr) = offender else { break };
            let Some(account) = inner.accounts.get_mut(&addr) else {
                break;
            };
            let len = account.pending.len();
            for tx in account.pending.resize(len - 1) {
                total = total.saturating_sub(tx.slots());
                self.lookup.remove(&tx.hash());
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "clipped pending overflow");
            inner.priced.removed(dropped, &self.lookup, &inner.locals);
        }
    }

    /// Shrink queued to the global queue cap, draining whole accounts in
    /// least-recently-active order first. Local senders are exempt.
    fn truncate_queue(&self, inner: &mut PoolInner) {
        let limit = self.config.global_queue;
        let mut total = inner.queued_slots();
        if total <= limit {
            return;
        }
        let mut order: Vec<(Instant, Address)> = inner
            .accounts
            .iter()
            .filter(|(addr, account)| {
                !inner.locals.contains(*addr) && !account.queue.is_empty()
            })
            .map(|(addr, account)| (account.last_activity, *addr))
            .collect();
        // pop() drains from the back, so sort idle accounts last
        order.sort_by_key(|(at, _)| std::cmp::Reverse(*at));

        let mut dropped = 0usize;
        while total > limit {
            let Some((_, addr)) = order.pop() else { break };
            let Some(account) = inner.accounts.get_mut(&addr) else {
                continue;
            };
            if account.queue.slots() <= total - limit {
                for tx in account.queue.clear() {
                    total = total.saturating_sub(tx.slots());
                    self.lookup.remove(&tx.hash());
                    dropped += 1;
                }
            } else {
                while total > limit && !account.queue.is_empty() {
                    let len = account.queue.len();
                    for tx in account.queue.resize(len - 1) {
                        total = total.saturating_sub(tx.slots());
                        self.lookup.remove(&tx.hash());
                        dropped += 1;
                    }
                }
            }
        }
        inner.accounts.retain(|_, account| !account.is_empty());
        if dropped > 0 {
            debug!(dropped, "clipped queue overflow");
            inner.priced.removed(dropped, &self.lookup, &inner.locals);
        }
    }

    /// Drop queued transactions from non-local accounts idle longer than
    /// the configured lifetime. Returns the number dropped.
    pub async fn evict_expired(&self) -> usize {
        let lifetime = self.config.lifetime;
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let mut dropped: Vec<PooledTransaction> = Vec::new();
        for (addr, account) in inner.accounts.iter_mut() {
            if inner.locals.contains(addr)
                || account.queue.is_empty()
                || account.last_activity.elapsed() < lifetime
            {
                continue;
            }
            dropped.extend(account.queue.clear());
        }
        inner.accounts.retain(|_, account| !account.is_empty());
        for tx in &dropped {
            self.lookup.remove(&tx.hash());
        }
        let count = dropped.len();
        if count > 0 {
            info!(count, "dropped expired queued transactions");
            inner.priced.removed(count, &self.lookup, &inner.locals);
        }
        count
    }

    /// Rewrite the journal to the currently pooled local transactions.
    pub async fn rotate_journal(&self) -> Result<(), JournalError> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let inner = self.inner.read().await;
        let mut txs: Vec<SignedTransaction> = Vec::new();
        for (addr, account) in &inner.accounts {
            if !inner.locals.contains(addr) {
                continue;
            }
            for tx in account.pending.to_vec() {
                txs.push(tx.tx().clone());
            }
            for tx in account.queue.to_vec() {
                txs.push(tx.tx().clone());
            }
        }
        drop(inner);
        journal.rotate(&txs)
    }

    /// Snapshot of all executable transactions, best price first with
    /// per-sender nonce order preserved.
    pub async fn pending_batch(&self) -> PendingBatch {
        let inner = self.inner.read().await;
        let mut batch = PendingBatch::new();
        for (addr, account) in &inner.accounts {
            if !account.pending.is_empty() {
                batch.push(*addr, account.pending.to_vec());
            }
        }
        batch
    }

    /// Look up a pooled transaction by hash.
    pub fn get(&self, hash: &H256) -> Option<PooledTransaction> {
        self.lookup.get(hash).map(|entry| entry.value().clone())
    }

    /// Hashes of everything currently pooled.
    pub fn pooled_hashes(&self) -> Vec<H256> {
        self.lookup.iter().map(|entry| *entry.key()).collect()
    }

    /// Executable transactions per sender, nonce-ordered.
    pub async fn list_pending(&self) -> HashMap<Address, Vec<PooledTransaction>> {
        let inner = self.inner.read().await;
        inner
            .accounts
            .iter()
            .filter(|(_, account)| !account.pending.is_empty())
            .map(|(addr, account)| (*addr, account.pending.to_vec()))
            .collect()
    }

    /// Queued transactions per sender, nonce-ordered.
    pub async fn list_queued(&self) -> HashMap<Address, Vec<PooledTransaction>> {
        let inner = self.inner.read().await;
        inner
            .accounts
            .iter()
            .filter(|(_, account)| !account.queue.is_empty())
            .map(|(addr, account)| (*addr, account.queue.to_vec()))
            .collect()
    }

    /// Current occupancy.
    pub async fn stats(&self) -> PoolStats {
        let inner = self.inner.read().await;
        PoolStats {
            pending: inner.accounts.values().map(|a| a.pending.len()).sum(),
            queued: inner.accounts.values().map(|a| a.queue.len()).sum(),
            slots: inner.total_slots(),
            capacity: self.config.capacity(),
        }
    }

    /// Grant `address` the local exemptions without a submission.
    pub async fn mark_local(&self, address: Address) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        if inner.locals.insert(address) {
            // entries already indexed for eviction become exempt
            inner.priced.reheap(&self.lookup, &inner.locals);
        }
    }

    /// Spawn the background loops: idle-queue sweeping and journal
    /// rotation. Both stop when [`TxPool::stop`] is called.
    pub fn spawn_maintenance(self: &Arc<Self>) {
        let pool = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(pool.config.sweep_interval);
            let mut rejournal = tokio::time::interval(pool.config.rejournal_interval);
            // both intervals fire immediately once; harmless
            loop {
                tokio::select! {
                    _ = sweep.tick() => {
                        pool.evict_expired().await;
                    }
                    _ = rejournal.tick() => {
                        if let Err(err) = pool.rotate_journal().await {
                            error!(error = %err, "journal rotation failed");
                        }
                    }
                    result = shutdown.changed() => {
                        if result.is_err() || *shutdown.borrow() {
                            debug!("pool maintenance stopping");
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Signal the maintenance loops to stop.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

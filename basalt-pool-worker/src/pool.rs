// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::collections::hash_map::Entry;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use basalt_models::{
    BlockHeader, BlockProposal, Hash, HashedMap, HashedSet, Nonce, PeerId, SignedTransaction,
    Timestamp, TransactionMetadata,
};
use basalt_pool_exports::{
    LedgerNonceChecker, PoolChannels, PoolConfig, PoolError, PoolNonceChecker,
    SubmitResultReceiver, SubmitResultSender, TransactionStatus, TransactionSubmitResult,
    TransactionValidator,
};
use parking_lot::{Mutex, RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info, trace, warn};

use crate::types::PoolTransaction;

type TxTable = HashedMap<Hash, Arc<PoolTransaction>>;

/// A transaction is fresh up to and including `import_time + expiration`.
pub(crate) fn is_expired(import_time: Timestamp, expiration: Timestamp, now: Timestamp) -> bool {
    now > import_time + expiration
}

/// The in-memory transaction pool.
///
/// One read/write lock guards the transaction table. Per-transaction flag
/// flips are atomic, so the read lock suffices for submission, queries and
/// optimistic sealing, while removal and unsealing take the write lock.
pub struct TxPool {
    config: PoolConfig,
    validator: Arc<dyn TransactionValidator>,
    pool_nonce_checker: Arc<dyn PoolNonceChecker>,
    ledger_nonce_checker: Arc<dyn LedgerNonceChecker>,
    channels: PoolChannels,

    txs: RwLock<TxTable>,
    sealed_count: AtomicUsize,

    /// Hashes queued for removal by `remove_invalid_txs`.
    invalid_txs: Mutex<HashedSet<Hash>>,
    /// Nonces of the queued hashes, dropped from the pool nonce checker on
    /// removal.
    invalid_nonces: Mutex<HashSet<Nonce>>,
    /// Hashes peers announced but we lack; bounded by the pool limit.
    missed_txs: Mutex<HashedSet<Hash>>,

    /// Height of the last committed block.
    block_number: AtomicI64,
    /// Millisecond timestamp of the first submission into an empty pool;
    /// zero while no tps window is open.
    tps_start: AtomicU64,
    on_chain_count: AtomicU64,
}

impl TxPool {
    /// Creates a pool around its validation collaborators.
    pub fn init(
        config: PoolConfig,
        validator: Arc<dyn TransactionValidator>,
        pool_nonce_checker: Arc<dyn PoolNonceChecker>,
        ledger_nonce_checker: Arc<dyn LedgerNonceChecker>,
        channels: PoolChannels,
    ) -> Self {
        info!(
            "init transaction pool: limit {}, expiration {} ms",
            config.pool_limit, config.tx_expiration
        );
        TxPool {
            config,
            validator,
            pool_nonce_checker,
            ledger_nonce_checker,
            channels,
            txs: RwLock::new(TxTable::default()),
            sealed_count: AtomicUsize::new(0),
            invalid_txs: Mutex::new(HashedSet::default()),
            invalid_nonces: Mutex::new(HashSet::new()),
            missed_txs: Mutex::new(HashedSet::default()),
            block_number: AtomicI64::new(0),
            tps_start: AtomicU64::new(0),
            on_chain_count: AtomicU64::new(0),
        }
    }

    /// Submits a client transaction. Rejections surface synchronously as an
    /// error; an accepted submission resolves the returned receiver exactly
    /// once, on commit or expiration.
    pub fn submit(&self, tx: SignedTransaction) -> Result<SubmitResultReceiver, PoolError> {
        let hash = tx.hash;
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        let status = self.verify_and_submit(tx, Some(result_tx), true);
        if status.is_ok() {
            Ok(result_rx)
        } else {
            debug!("submit of {} rejected: {}", hash.abridged(), status);
            Err(PoolError::Rejected(status))
        }
    }

    /// Imports peer-gossiped transactions. The capacity limit is not
    /// enforced here so transactions can reach every node; individual
    /// failures are skipped.
    pub fn batch_import(&self, txs: Vec<SignedTransaction>) {
        let total = txs.len();
        let mut imported = Vec::with_capacity(total);
        for tx in txs {
            let hash = tx.hash;
            let status = self.verify_and_submit(tx, None, false);
            if status.is_ok() {
                imported.push(hash);
            } else {
                trace!("import of {} skipped: {}", hash.abridged(), status);
            }
        }
        {
            let mut missed = self.missed_txs.lock();
            for hash in &imported {
                missed.remove(hash);
            }
        }
        debug!("imported {}/{} peer transactions", imported.len(), total);
    }

    fn verify_and_submit(
        &self,
        tx: SignedTransaction,
        result_tx: Option<SubmitResultSender>,
        check_limit: bool,
    ) -> TransactionStatus {
        let pool_size = {
            let txs = self.txs.read();
            if txs.contains_key(&tx.hash) {
                return TransactionStatus::AlreadyInPool;
            }
            txs.len()
        };

        // the tps window opens with the first transaction of an empty pool
        if pool_size == 0 && self.tps_start.load(Ordering::Relaxed) == 0 {
            self.tps_start
                .store(Timestamp::now().to_millis(), Ordering::Relaxed);
        }

        if check_limit && pool_size >= self.config.pool_limit {
            return TransactionStatus::PoolIsFull;
        }

        let status = self.validator.verify(&tx);
        if !status.is_ok() {
            return status;
        }

        let pooled = Arc::new(PoolTransaction::new(tx, Timestamp::now(), result_tx));
        self.insert(pooled)
    }

    fn insert(&self, pooled: Arc<PoolTransaction>) -> TransactionStatus {
        let table_len = {
            let mut txs = self.txs.write();
            match txs.entry(pooled.hash()) {
                Entry::Occupied(_) => return TransactionStatus::AlreadyInPool,
                Entry::Vacant(slot) => {
                    slot.insert(pooled);
                }
            }
            txs.len()
        };
        self.notify_unsealed_size(table_len);
        TransactionStatus::None
    }

    /// Accepts every transaction of a verified proposal, sealing each into
    /// the proposal's `(number, hash)`. The first rejection aborts the batch.
    pub fn batch_verify_and_submit(
        &self,
        header: &BlockHeader,
        proposal_txs: Vec<SignedTransaction>,
    ) -> Result<(), PoolError> {
        let table_len = {
            let mut txs = self.txs.write();
            for tx in proposal_txs {
                let hash = tx.hash;
                let status = self.enforce_submit(&mut txs, tx, header.number, header.hash);
                if !status.is_ok() {
                    warn!(
                        "proposal {} ({}) rejected at {}: {}",
                        header.number,
                        header.hash.abridged(),
                        hash.abridged(),
                        status
                    );
                    return Err(PoolError::ProposalRejected(hash, status));
                }
            }
            txs.len()
        };
        self.notify_unsealed_size(table_len);
        Ok(())
    }

    /// Sealing-on-behalf-of-consensus. The caller holds the write lock.
    fn enforce_submit(
        &self,
        txs: &mut TxTable,
        tx: SignedTransaction,
        batch_id: i64,
        batch_hash: Hash,
    ) -> TransactionStatus {
        // an already-committed nonce can never be accepted again
        if self.validator.submitted_to_chain(&tx) == TransactionStatus::NonceCheckFail {
            if let Some(existing) = txs.get(&tx.hash) {
                warn!(
                    "enforced seal of {} failed nonce check: sealed batch {} ({}), incoming batch {} ({})",
                    existing.hash().abridged(),
                    existing.batch_id(),
                    existing.batch_hash().abridged(),
                    batch_id,
                    batch_hash.abridged()
                );
            }
            return TransactionStatus::NonceCheckFail;
        }

        if let Some(existing) = txs.get(&tx.hash) {
            if !existing.sealed() || existing.batch_hash().is_zero() {
                if existing.mark_sealed() {
                    self.sealed_count.fetch_add(1, Ordering::Relaxed);
                }
                existing.set_batch(batch_id, batch_hash);
                trace!(
                    "enforced seal of {} into {} ({})",
                    existing.hash().abridged(),
                    batch_id,
                    batch_hash.abridged()
                );
                return TransactionStatus::None;
            }
            if existing.batch_id() == batch_id && existing.batch_hash() == batch_hash {
                // already sealed for this very proposal
                return TransactionStatus::None;
            }
            warn!(
                "enforced seal of {} refused: sealed into batch {} ({}), incoming batch {} ({})",
                existing.hash().abridged(),
                existing.batch_id(),
                existing.batch_hash().abridged(),
                batch_id,
                batch_hash.abridged()
            );
            return TransactionStatus::AlreadyInPool;
        }

        let pooled = Arc::new(PoolTransaction::new(tx, Timestamp::now(), None));
        pooled.mark_sealed();
        pooled.set_batch(batch_id, batch_hash);
        self.sealed_count.fetch_add(1, Ordering::Relaxed);
        txs.insert(pooled.hash(), pooled);
        TransactionStatus::None
    }

    /// Removes one transaction, returning its payload.
    pub fn remove(&self, hash: &Hash) -> Option<SignedTransaction> {
        let (removed, table_len) = {
            let mut txs = self.txs.write();
            let removed = self.remove_locked(&mut txs, hash);
            (removed, txs.len())
        };
        self.notify_unsealed_size(table_len);
        removed.map(|pooled| pooled.tx().clone())
    }

    fn remove_locked(&self, txs: &mut TxTable, hash: &Hash) -> Option<Arc<PoolTransaction>> {
        let pooled = txs.remove(hash)?;
        if pooled.sealed() {
            self.sealed_count.fetch_sub(1, Ordering::Relaxed);
        }
        Some(pooled)
    }

    /// Removes the transactions committed by block `batch_id`, commits their
    /// nonces to the ledger checker, drops them from the pool checker, and
    /// notifies each submitter after the lock is released, in result order.
    pub fn batch_remove(&self, batch_id: i64, results: Vec<TransactionSubmitResult>) {
        let total = results.len();
        let mut nonces = Vec::with_capacity(total);
        let mut notifications = Vec::with_capacity(total);
        let mut matched = 0usize;
        let table_len = {
            let mut txs = self.txs.write();
            for result in results {
                match self.remove_locked(&mut txs, &result.tx_hash) {
                    Some(pooled) => {
                        matched += 1;
                        nonces.push(pooled.nonce().clone());
                        notifications.push((Some(pooled), result));
                    }
                    None => {
                        // committed by a peer proposal whose body we never held
                        if !result.nonce.is_empty() {
                            nonces.push(result.nonce.clone());
                        }
                        notifications.push((None, result));
                    }
                }
            }
            self.block_number.fetch_max(batch_id, Ordering::Relaxed);
            txs.len()
        };

        self.on_chain_count.fetch_add(total as u64, Ordering::Relaxed);
        if table_len == 0 {
            self.log_tps();
        }

        self.notify_unsealed_size(table_len);
        self.ledger_nonce_checker.batch_insert(batch_id, &nonces);
        self.pool_nonce_checker.batch_remove(&nonces);

        for (pooled, result) in notifications {
            if let Some(pooled) = pooled {
                self.notify_tx_result(&pooled, result);
            }
        }
        info!(
            "removed committed transactions of block {}: {} expected, {} matched",
            batch_id, total, matched
        );
    }

    /// The tps window closes when the pool drains.
    fn log_tps(&self) {
        let start = self.tps_start.load(Ordering::Relaxed);
        if start == 0 {
            return;
        }
        let elapsed = Timestamp::now()
            .saturating_sub(Timestamp::from_millis(start))
            .to_millis();
        if elapsed > 0 {
            let tps = self
                .on_chain_count
                .load(Ordering::Relaxed)
                .saturating_mul(1000)
                / elapsed;
            info!("pool drained: {} tps over {} ms", tps, elapsed);
        }
        self.tps_start.store(0, Ordering::Relaxed);
        self.on_chain_count.store(0, Ordering::Relaxed);
    }

    fn notify_tx_result(&self, pooled: &PoolTransaction, mut result: TransactionSubmitResult) {
        let Some(sender) = pooled.take_submit_sender() else {
            return;
        };
        result.sender = Some(pooled.tx().sender.clone());
        result.to = Some(pooled.tx().to.clone());
        if sender.send(result).is_err() {
            debug!(
                "submitter of {} went away before its result",
                pooled.hash().abridged()
            );
        }
    }

    /// Looks up transactions by hash.
    pub fn fetch_txs(&self, hashes: &[Hash]) -> (Vec<SignedTransaction>, Vec<Hash>) {
        let txs = self.txs.read();
        let mut found = Vec::with_capacity(hashes.len());
        let mut missed = Vec::new();
        for hash in hashes {
            match txs.get(hash) {
                Some(pooled) => found.push(pooled.tx().clone()),
                None => {
                    trace!("miss: {}", hash.abridged());
                    missed.push(*hash);
                }
            }
        }
        (found, missed)
    }

    /// Returns up to `limit` transactions not yet synced to peers, marking
    /// them synced.
    pub fn fetch_new_txs(&self, limit: usize) -> Vec<SignedTransaction> {
        let txs = self.txs.read();
        let mut fetched = Vec::new();
        for pooled in txs.values() {
            if fetched.len() >= limit {
                break;
            }
            if !pooled.mark_synced() {
                continue;
            }
            fetched.push(pooled.tx().clone());
        }
        fetched
    }

    /// Picks up to `limit` transactions for block assembly and seals them,
    /// expiring and nonce-rechecking along the way. System transactions come
    /// back in the second list.
    pub fn batch_fetch_txs(
        &self,
        limit: usize,
        avoid: &HashedSet<Hash>,
        avoid_duplicate: bool,
    ) -> (Vec<TransactionMetadata>, Vec<TransactionMetadata>) {
        let mut normal = Vec::new();
        let mut sys = Vec::new();
        let txs = self.txs.upgradable_read();
        debug!(
            "fetching up to {} of {} pending transactions",
            limit,
            txs.len()
        );
        let now = Timestamp::now();
        {
            let mut invalid_txs = self.invalid_txs.lock();
            let mut invalid_nonces = self.invalid_nonces.lock();
            for pooled in txs.values() {
                if normal.len() + sys.len() >= limit {
                    break;
                }
                if pooled.is_invalid() {
                    continue;
                }
                // already sealed for a newer proposal
                if avoid_duplicate && pooled.sealed() {
                    continue;
                }
                if is_expired(pooled.import_time(), self.config.tx_expiration, now) {
                    pooled.mark_invalid();
                    invalid_txs.insert(pooled.hash());
                    invalid_nonces.insert(pooled.nonce().clone());
                    continue;
                }
                // nonce re-check: a duplicate surviving here was committed
                // meanwhile but not yet dropped
                match self.validator.submitted_to_chain(pooled.tx()) {
                    TransactionStatus::NonceCheckFail => {
                        // the submitter may already have been notified
                        pooled.take_submit_sender();
                        pooled.mark_invalid();
                        invalid_txs.insert(pooled.hash());
                        invalid_nonces.insert(pooled.nonce().clone());
                        continue;
                    }
                    TransactionStatus::BlockLimitCheckFail => {
                        pooled.mark_invalid();
                        invalid_txs.insert(pooled.hash());
                        invalid_nonces.insert(pooled.nonce().clone());
                        continue;
                    }
                    _ => {}
                }
                if avoid.contains(&pooled.hash()) {
                    continue;
                }
                let meta = pooled.tx().metadata();
                if pooled.tx().system_tx {
                    sys.push(meta);
                } else {
                    normal.push(meta);
                }
                if pooled.mark_sealed() {
                    self.sealed_count.fetch_add(1, Ordering::Relaxed);
                }
                // bound to a concrete proposal later, by batch_mark_txs
                pooled.clear_batch();
            }
        }
        self.notify_unsealed_size(txs.len());

        let mut txs = RwLockUpgradableReadGuard::upgrade(txs);
        self.remove_invalid_locked(&mut txs);
        debug!(
            "fetched {} + {} system transactions, {} pending",
            normal.len(),
            sys.len(),
            txs.len()
        );
        (normal, sys)
    }

    /// Removes every transaction queued in the invalid sidebar, notifying
    /// submitters with a timeout result and dropping the queued nonces from
    /// the pool nonce checker.
    pub fn remove_invalid_txs(&self) {
        let mut txs = self.txs.write();
        self.remove_invalid_locked(&mut txs);
    }

    fn remove_invalid_locked(&self, txs: &mut TxTable) {
        let stale: Vec<Hash> = {
            let mut invalid_txs = self.invalid_txs.lock();
            invalid_txs.drain().collect()
        };
        if stale.is_empty() {
            return;
        }
        for hash in &stale {
            if let Some(pooled) = self.remove_locked(txs, hash) {
                let result = TransactionSubmitResult::new(*hash, TransactionStatus::PoolTimeout)
                    .with_nonce(pooled.nonce().clone());
                self.notify_tx_result(&pooled, result);
            }
        }
        self.notify_unsealed_size(txs.len());
        let dropped: Vec<Nonce> = {
            let mut invalid_nonces = self.invalid_nonces.lock();
            invalid_nonces.drain().collect()
        };
        self.pool_nonce_checker.batch_remove(&dropped);
        debug!("dropped {} invalid transactions", stale.len());
    }

    /// Seals or unseals the given transactions. Sealing binds them to
    /// `(batch_id, batch_hash)`; unsealing is refused for transactions
    /// meanwhile sealed into a different proposal.
    pub fn batch_mark_txs(&self, hashes: &[Hash], batch_id: i64, batch_hash: &Hash, seal: bool) {
        if seal {
            // sealing is additive and flag flips are atomic: the read lock
            // keeps concurrent sealers idempotent
            let txs = self.txs.read();
            self.mark_locked(&txs, hashes, batch_id, batch_hash, true);
            self.notify_unsealed_size(txs.len());
        } else {
            // unsealing races with re-sealing, take the write lock
            let txs = self.txs.write();
            self.mark_locked(&txs, hashes, batch_id, batch_hash, false);
            self.notify_unsealed_size(txs.len());
        }
    }

    fn mark_locked(
        &self,
        txs: &TxTable,
        hashes: &[Hash],
        batch_id: i64,
        batch_hash: &Hash,
        seal: bool,
    ) {
        let mut updated = 0usize;
        for hash in hashes {
            let Some(pooled) = txs.get(hash) else {
                trace!("marking missing transaction {}", hash.abridged());
                continue;
            };
            if !seal
                && pooled.sealed()
                && (pooled.batch_id() != batch_id || pooled.batch_hash() != *batch_hash)
            {
                // re-sealed into another proposal meanwhile, leave it
                continue;
            }
            if seal {
                if pooled.mark_sealed() {
                    self.sealed_count.fetch_add(1, Ordering::Relaxed);
                }
                pooled.set_batch(batch_id, *batch_hash);
            } else if pooled.mark_unsealed() {
                self.sealed_count.fetch_sub(1, Ordering::Relaxed);
            }
            updated += 1;
        }
        debug!(
            "marked {}/{} transactions seal={} batch {} ({})",
            updated,
            hashes.len(),
            seal,
            batch_id,
            batch_hash.abridged()
        );
    }

    /// Seals or unseals every pending transaction.
    pub fn batch_mark_all(&self, seal: bool) {
        let txs = self.txs.read();
        for pooled in txs.values() {
            if seal {
                pooled.mark_sealed();
            } else {
                pooled.mark_unsealed();
                pooled.clear_batch();
            }
        }
        self.sealed_count
            .store(if seal { txs.len() } else { 0 }, Ordering::Relaxed);
        self.notify_unsealed_size(txs.len());
    }

    /// Number of pending transactions not sealed into any proposal.
    pub fn unsealed_txs_size(&self) -> usize {
        let txs = self.txs.read();
        self.unsealed_size_for(txs.len())
    }

    fn unsealed_size_for(&self, table_len: usize) -> usize {
        let sealed = self.sealed_count.load(Ordering::Relaxed);
        if table_len < sealed {
            self.sealed_count.store(table_len, Ordering::Relaxed);
            return 0;
        }
        table_len - sealed
    }

    fn notify_unsealed_size(&self, table_len: usize) {
        let unsealed = self.unsealed_size_for(table_len);
        let mut attempt = 0;
        loop {
            match (self.channels.unsealed_size_notifier)(unsealed) {
                Ok(()) => return,
                Err(err) => {
                    warn!("unsealed-size notification failed: {}", err);
                    if attempt >= self.config.max_notify_retries {
                        return;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Reports the hashes a proposal references that this pool lacks.
    pub fn verify_proposal(&self, proposal: &BlockProposal) -> Vec<Hash> {
        if proposal.tx_hashes.is_empty() {
            return Vec::new();
        }
        let txs = self.txs.read();
        let missed: Vec<Hash> = proposal
            .tx_hashes
            .iter()
            .filter(|hash| !txs.contains_key(hash))
            .copied()
            .collect();
        info!(
            "verified proposal {} ({}): {}/{} transactions missing",
            proposal.header.number,
            proposal.header.hash.abridged(),
            missed.len(),
            proposal.tx_hashes.len()
        );
        missed
    }

    /// Whether every one of the given hashes is pending here.
    pub fn proposal_known(&self, hashes: &[Hash]) -> bool {
        let txs = self.txs.read();
        hashes.iter().all(|hash| txs.contains_key(hash))
    }

    /// Records `peer` as knowing each hash we hold; returns the hashes
    /// unknown to us that were not already requested from another peer.
    pub fn filter_unknown_txs(&self, hashes: &[Hash], peer: &PeerId) -> Vec<Hash> {
        let txs = self.txs.read();
        for hash in hashes {
            if let Some(pooled) = txs.get(hash) {
                pooled.add_known_peer(peer.clone());
            }
        }
        let mut unknown = Vec::new();
        let mut missed = self.missed_txs.lock();
        for hash in hashes {
            if txs.contains_key(hash) || missed.contains(hash) {
                continue;
            }
            missed.insert(*hash);
            unknown.push(*hash);
        }
        if missed.len() >= self.config.pool_limit {
            missed.clear();
        }
        unknown
    }

    /// Returns up to `limit` pending transaction hashes.
    pub fn tx_hashes(&self, limit: usize) -> Vec<Hash> {
        let txs = self.txs.read();
        txs.keys().take(limit).copied().collect()
    }

    /// Number of pending transactions.
    pub fn pending_txs_size(&self) -> usize {
        self.txs.read().len()
    }

    /// Timer-driven expiration sweep. Consensus nodes expire lazily while
    /// sealing and keep the switch off.
    pub fn clean_up_expired(&self) {
        if let Some(switch) = &self.channels.cleanup_switch {
            if !switch() {
                return;
            }
        }
        let txs = self.txs.upgradable_read();
        if txs.is_empty() {
            return;
        }
        let block_number = self.block_number.load(Ordering::Relaxed);
        let now = Timestamp::now();
        let mut traversed = 0usize;
        let mut expired = 0usize;
        {
            let mut invalid_txs = self.invalid_txs.lock();
            let mut invalid_nonces = self.invalid_nonces.lock();
            for pooled in txs.values() {
                if traversed > self.config.max_sweep_traverse {
                    break;
                }
                traversed += 1;
                if pooled.is_invalid() {
                    continue;
                }
                // sealed into a proposal not yet committed: consensus owns it
                if pooled.sealed() && pooled.batch_id() >= block_number {
                    continue;
                }
                if is_expired(pooled.import_time(), self.config.tx_expiration, now) {
                    pooled.mark_invalid();
                    invalid_txs.insert(pooled.hash());
                    invalid_nonces.insert(pooled.nonce().clone());
                    expired += 1;
                }
            }
        }
        info!(
            "expiration sweep: {} pending, {} expired",
            txs.len(),
            expired
        );
        let mut txs = RwLockUpgradableReadGuard::upgrade(txs);
        self.remove_invalid_locked(&mut txs);
    }

    /// Drops every pending transaction and resets the sidebars.
    pub fn clear(&self) {
        let mut txs = self.txs.write();
        txs.clear();
        self.invalid_txs.lock().clear();
        self.invalid_nonces.lock().clear();
        self.missed_txs.lock().clear();
        self.sealed_count.store(0, Ordering::Relaxed);
        self.notify_unsealed_size(0);
    }

    #[cfg(test)]
    pub(crate) fn transaction(&self, hash: &Hash) -> Option<Arc<PoolTransaction>> {
        self.txs.read().get(hash).cloned()
    }

    #[cfg(test)]
    pub(crate) fn sealed_txs_size(&self) -> usize {
        self.sealed_count.load(Ordering::Relaxed)
    }
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use basalt_models::{Hash, Nonce, PeerId, SignedTransaction, Timestamp};
use basalt_pool_exports::SubmitResultSender;
use parking_lot::Mutex;

/// A pooled transaction: the immutable payload plus the pool-side mutable
/// flags.
///
/// Flag flips are atomic so holders of the pool read lock may seal or sync a
/// transaction concurrently; removal still requires the pool write lock,
/// which is therefore the only barrier a reader needs against a transaction
/// disappearing mid-use.
pub(crate) struct PoolTransaction {
    tx: SignedTransaction,
    import_time: AtomicU64,
    sealed: AtomicBool,
    synced: AtomicBool,
    invalid: AtomicBool,
    batch_id: AtomicI64,
    batch_hash: Mutex<Hash>,
    known_peers: Mutex<HashSet<PeerId>>,
    submit_result_tx: Mutex<Option<SubmitResultSender>>,
}

impl PoolTransaction {
    pub(crate) fn new(
        tx: SignedTransaction,
        import_time: Timestamp,
        submit_result_tx: Option<SubmitResultSender>,
    ) -> Self {
        PoolTransaction {
            tx,
            import_time: AtomicU64::new(import_time.to_millis()),
            sealed: AtomicBool::new(false),
            synced: AtomicBool::new(false),
            invalid: AtomicBool::new(false),
            batch_id: AtomicI64::new(-1),
            batch_hash: Mutex::new(Hash::zero()),
            known_peers: Mutex::new(HashSet::new()),
            submit_result_tx: Mutex::new(submit_result_tx),
        }
    }

    pub(crate) fn tx(&self) -> &SignedTransaction {
        &self.tx
    }

    pub(crate) fn hash(&self) -> Hash {
        self.tx.hash
    }

    pub(crate) fn nonce(&self) -> &Nonce {
        &self.tx.nonce
    }

    pub(crate) fn import_time(&self) -> Timestamp {
        Timestamp::from_millis(self.import_time.load(Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) fn set_import_time(&self, at: Timestamp) {
        self.import_time.store(at.to_millis(), Ordering::Relaxed);
    }

    pub(crate) fn sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Seals the transaction; true when this call flipped the flag.
    pub(crate) fn mark_sealed(&self) -> bool {
        self.sealed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unseals the transaction; true when this call flipped the flag.
    pub(crate) fn mark_unsealed(&self) -> bool {
        self.sealed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn batch_id(&self) -> i64 {
        self.batch_id.load(Ordering::Acquire)
    }

    pub(crate) fn batch_hash(&self) -> Hash {
        *self.batch_hash.lock()
    }

    pub(crate) fn set_batch(&self, batch_id: i64, batch_hash: Hash) {
        self.batch_id.store(batch_id, Ordering::Release);
        *self.batch_hash.lock() = batch_hash;
    }

    pub(crate) fn clear_batch(&self) {
        self.set_batch(-1, Hash::zero());
    }

    /// Marks the transaction synced; true when this call flipped the flag.
    pub(crate) fn mark_synced(&self) -> bool {
        self.synced
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    pub(crate) fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    /// Flags the transaction as queued for invalid-removal.
    pub(crate) fn mark_invalid(&self) {
        self.invalid.store(true, Ordering::Release);
    }

    pub(crate) fn add_known_peer(&self, peer: PeerId) {
        self.known_peers.lock().insert(peer);
    }

    #[cfg(test)]
    pub(crate) fn knows_peer(&self, peer: &PeerId) -> bool {
        self.known_peers.lock().contains(peer)
    }

    /// Takes the submit callback; subsequent calls return `None` so a
    /// transaction is never notified twice.
    pub(crate) fn take_submit_sender(&self) -> Option<SubmitResultSender> {
        self.submit_result_tx.lock().take()
    }
}

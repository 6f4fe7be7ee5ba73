// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Recording mocks for the pool's validation collaborators. Each mock
//! answers from a programmable table and records every call so tests can
//! assert on the interactions.

use std::sync::Arc;

use basalt_models::{Hash, HashedMap, Nonce, SignedTransaction};
use parking_lot::Mutex;

use crate::channels::UnsealedSizeNotifier;
use crate::error::PoolError;
use crate::types::TransactionStatus;
use crate::validation::{LedgerNonceChecker, PoolNonceChecker, TransactionValidator};

/// A validator answering `TransactionStatus::None` unless a response was
/// programmed for the transaction's hash.
#[derive(Default)]
pub struct MockValidator {
    verify_responses: Mutex<HashedMap<Hash, TransactionStatus>>,
    chain_responses: Mutex<HashedMap<Hash, TransactionStatus>>,
}

impl MockValidator {
    /// Creates a permissive validator.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Programs the `verify` answer for one transaction.
    pub fn set_verify_status(&self, hash: Hash, status: TransactionStatus) {
        self.verify_responses.lock().insert(hash, status);
    }

    /// Programs the `submitted_to_chain` answer for one transaction.
    pub fn set_chain_status(&self, hash: Hash, status: TransactionStatus) {
        self.chain_responses.lock().insert(hash, status);
    }
}

impl TransactionValidator for MockValidator {
    fn verify(&self, tx: &SignedTransaction) -> TransactionStatus {
        self.verify_responses
            .lock()
            .get(&tx.hash)
            .copied()
            .unwrap_or(TransactionStatus::None)
    }

    fn submitted_to_chain(&self, tx: &SignedTransaction) -> TransactionStatus {
        self.chain_responses
            .lock()
            .get(&tx.hash)
            .copied()
            .unwrap_or(TransactionStatus::None)
    }
}

/// Pool-side nonce checker recording every removal.
#[derive(Default)]
pub struct MockPoolNonceChecker {
    removed: Mutex<Vec<Nonce>>,
}

impl MockPoolNonceChecker {
    /// Creates an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every nonce removed so far, in call order.
    pub fn removed(&self) -> Vec<Nonce> {
        self.removed.lock().clone()
    }
}

impl PoolNonceChecker for MockPoolNonceChecker {
    fn batch_remove(&self, nonces: &[Nonce]) {
        self.removed.lock().extend_from_slice(nonces);
    }
}

/// Ledger-side nonce checker recording every committed batch.
#[derive(Default)]
pub struct MockLedgerNonceChecker {
    inserted: Mutex<Vec<(i64, Vec<Nonce>)>>,
}

impl MockLedgerNonceChecker {
    /// Creates an empty recorder.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every `(batch_id, nonces)` insertion so far, in call order.
    pub fn inserted(&self) -> Vec<(i64, Vec<Nonce>)> {
        self.inserted.lock().clone()
    }
}

impl LedgerNonceChecker for MockLedgerNonceChecker {
    fn batch_insert(&self, batch_id: i64, nonces: &[Nonce]) {
        self.inserted.lock().push((batch_id, nonces.to_vec()));
    }
}

/// Builds a notifier that records every reported size.
pub fn recording_notifier() -> (UnsealedSizeNotifier, Arc<Mutex<Vec<usize>>>) {
    let sizes: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = sizes.clone();
    let notifier: UnsealedSizeNotifier = Arc::new(move |size| {
        recorded.lock().push(size);
        Ok(())
    });
    (notifier, sizes)
}

/// Builds a notifier that fails `failures` times before succeeding,
/// recording the total number of attempts.
pub fn failing_notifier(failures: u32) -> (UnsealedSizeNotifier, Arc<Mutex<u32>>) {
    let attempts: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
    let counter = attempts.clone();
    let notifier: UnsealedSizeNotifier = Arc::new(move |_size| {
        let mut count = counter.lock();
        *count += 1;
        if *count <= failures {
            Err(PoolError::NotifyError("notifier unavailable".into()))
        } else {
            Ok(())
        }
    });
    (notifier, attempts)
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use basalt_models::{Nonce, SignedTransaction};

use crate::types::TransactionStatus;

/// Validation contract the pool delegates to on ingestion and sealing.
///
/// Implementations wrap the signature checker and the ledger: the pool only
/// interprets the returned status.
pub trait TransactionValidator: Send + Sync {
    /// Full admission check: signature, format, gas.
    fn verify(&self, tx: &SignedTransaction) -> TransactionStatus;

    /// Ledger-side re-check at sealing time: nonce against committed state
    /// and the transaction's block-limit window.
    fn submitted_to_chain(&self, tx: &SignedTransaction) -> TransactionStatus;
}

/// Tracker of nonces pending in the pool, preventing duplicate pending
/// nonces across transactions.
pub trait PoolNonceChecker: Send + Sync {
    /// Forgets nonces whose transactions left the pool.
    fn batch_remove(&self, nonces: &[Nonce]);
}

/// Tracker of nonces finalized on chain, rejecting replayed transactions.
pub trait LedgerNonceChecker: Send + Sync {
    /// Records the nonces committed by the given block.
    fn batch_insert(&self, batch_id: i64, nonces: &[Nonce]);
}

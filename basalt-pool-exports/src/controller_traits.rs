// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use basalt_models::{
    BlockHeader, BlockProposal, Hash, HashedSet, PeerId, SignedTransaction, TransactionMetadata,
};

use crate::error::PoolError;
use crate::types::{SubmitResultReceiver, TransactionSubmitResult};

/// Trait defining the transaction pool controller.
pub trait TxPoolController: Send + Sync {
    /// Submits a client transaction. Capacity and validity are checked
    /// synchronously: a rejection is returned as an error, an accepted
    /// submission returns a receiver that resolves exactly once with the
    /// commit (or expiration) result.
    fn submit(&self, tx: SignedTransaction) -> Result<SubmitResultReceiver, PoolError>;

    /// Imports transactions gossiped by a peer. Bypasses the capacity limit
    /// so transactions can reach every node; individual failures are
    /// trace-logged and skipped.
    fn batch_import(&self, txs: Vec<SignedTransaction>);

    /// Accepts the transactions of a verified proposal, sealing each into
    /// the proposal's `(number, hash)`. Any rejection aborts the batch and
    /// names the offending transaction.
    fn batch_verify_and_submit(
        &self,
        header: &BlockHeader,
        txs: Vec<SignedTransaction>,
    ) -> Result<(), PoolError>;

    /// Picks up to `limit` pending transactions for block assembly, sealing
    /// them. System transactions come back in the second list. Transactions
    /// in `avoid` are skipped; `avoid_duplicate` additionally skips already
    /// sealed ones.
    fn batch_fetch_txs(
        &self,
        limit: usize,
        avoid: &HashedSet<Hash>,
        avoid_duplicate: bool,
    ) -> (Vec<TransactionMetadata>, Vec<TransactionMetadata>);

    /// Seals (`seal=true`) or unseals the given transactions. Sealing binds
    /// them to `(batch_id, batch_hash)`; unsealing is refused for
    /// transactions meanwhile sealed into a different proposal.
    fn batch_mark_txs(&self, hashes: &[Hash], batch_id: i64, batch_hash: &Hash, seal: bool);

    /// Seals or unseals every pending transaction.
    fn batch_mark_all(&self, seal: bool);

    /// Removes the transactions committed by block `batch_id`, records their
    /// nonces, and notifies each submitter with its result.
    fn batch_remove(&self, batch_id: i64, results: Vec<TransactionSubmitResult>);

    /// Looks up transactions by hash, returning the found bodies and the
    /// hashes we lack.
    fn fetch_txs(&self, hashes: &[Hash]) -> (Vec<SignedTransaction>, Vec<Hash>);

    /// Returns up to `limit` transactions not yet synced to peers, marking
    /// them synced.
    fn fetch_new_txs(&self, limit: usize) -> Vec<SignedTransaction>;

    /// Reports the hashes a proposal references that this pool lacks.
    fn verify_proposal(&self, proposal: &BlockProposal) -> Vec<Hash>;

    /// Whether every one of the given hashes is pending in this pool.
    fn proposal_known(&self, hashes: &[Hash]) -> bool;

    /// Records `peer` as knowing each of the given hashes we hold, and
    /// returns the ones unknown to us that were not already requested.
    fn filter_unknown_txs(&self, hashes: &[Hash], peer: &PeerId) -> Vec<Hash>;

    /// Returns up to `limit` pending transaction hashes.
    fn tx_hashes(&self, limit: usize) -> Vec<Hash>;

    /// Number of pending transactions not sealed into any proposal.
    fn unsealed_txs_size(&self) -> usize;

    /// Number of pending transactions.
    fn pending_txs_size(&self) -> usize;

    /// Drops every pending transaction and resets the bookkeeping sidebars.
    fn clear(&self);

    /// Returns a boxed clone of self.
    /// Useful to allow cloning `Box<dyn TxPoolController>`.
    fn clone_box(&self) -> Box<dyn TxPoolController>;
}

impl Clone for Box<dyn TxPoolController> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Handle stopping the pool worker.
pub trait TxPoolManager: Send {
    /// Stops the cleanup timer and joins the worker thread.
    fn stop(&mut self);
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Controller and manager implementations wrapping the shared pool.

use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread::JoinHandle;

use basalt_models::{
    BlockHeader, BlockProposal, Hash, HashedSet, PeerId, SignedTransaction, TransactionMetadata,
};
use basalt_pool_exports::{
    PoolError, SubmitResultReceiver, TransactionSubmitResult, TxPoolController, TxPoolManager,
};
use tracing::info;

use crate::pool::TxPool;

/// Commands accepted by the cleanup worker thread.
pub(crate) enum Command {
    Stop,
}

/// Implementation of the pool controller: a cheap clonable handle on the
/// shared pool.
#[derive(Clone)]
pub struct TxPoolControllerImpl {
    pub(crate) pool: Arc<TxPool>,
}

impl TxPoolController for TxPoolControllerImpl {
    fn submit(&self, tx: SignedTransaction) -> Result<SubmitResultReceiver, PoolError> {
        self.pool.submit(tx)
    }

    fn batch_import(&self, txs: Vec<SignedTransaction>) {
        self.pool.batch_import(txs)
    }

    fn batch_verify_and_submit(
        &self,
        header: &BlockHeader,
        txs: Vec<SignedTransaction>,
    ) -> Result<(), PoolError> {
        self.pool.batch_verify_and_submit(header, txs)
    }

    fn batch_fetch_txs(
        &self,
        limit: usize,
        avoid: &HashedSet<Hash>,
        avoid_duplicate: bool,
    ) -> (Vec<TransactionMetadata>, Vec<TransactionMetadata>) {
        self.pool.batch_fetch_txs(limit, avoid, avoid_duplicate)
    }

    fn batch_mark_txs(&self, hashes: &[Hash], batch_id: i64, batch_hash: &Hash, seal: bool) {
        self.pool.batch_mark_txs(hashes, batch_id, batch_hash, seal)
    }

    fn batch_mark_all(&self, seal: bool) {
        self.pool.batch_mark_all(seal)
    }

    fn batch_remove(&self, batch_id: i64, results: Vec<TransactionSubmitResult>) {
        self.pool.batch_remove(batch_id, results)
    }

    fn fetch_txs(&self, hashes: &[Hash]) -> (Vec<SignedTransaction>, Vec<Hash>) {
        self.pool.fetch_txs(hashes)
    }

    fn fetch_new_txs(&self, limit: usize) -> Vec<SignedTransaction> {
        self.pool.fetch_new_txs(limit)
    }

    fn verify_proposal(&self, proposal: &BlockProposal) -> Vec<Hash> {
        self.pool.verify_proposal(proposal)
    }

    fn proposal_known(&self, hashes: &[Hash]) -> bool {
        self.pool.proposal_known(hashes)
    }

    fn filter_unknown_txs(&self, hashes: &[Hash], peer: &PeerId) -> Vec<Hash> {
        self.pool.filter_unknown_txs(hashes, peer)
    }

    fn tx_hashes(&self, limit: usize) -> Vec<Hash> {
        self.pool.tx_hashes(limit)
    }

    fn unsealed_txs_size(&self) -> usize {
        self.pool.unsealed_txs_size()
    }

    fn pending_txs_size(&self) -> usize {
        self.pool.pending_txs_size()
    }

    fn clear(&self) {
        self.pool.clear()
    }

    fn clone_box(&self) -> Box<dyn TxPoolController> {
        Box::new(self.clone())
    }
}

/// Pool manager: stops the cleanup worker.
pub struct TxPoolManagerImpl {
    pub(crate) cleanup_thread_handle: Option<JoinHandle<()>>,
    pub(crate) command_sender: SyncSender<Command>,
}

impl TxPoolManager for TxPoolManagerImpl {
    fn stop(&mut self) {
        info!("stopping transaction pool...");
        let _ = self.command_sender.send(Command::Stop);
        if let Some(handle) = self.cleanup_thread_handle.take() {
            handle.join().expect("txpool cleanup thread panicked");
        }
        info!("transaction pool stopped");
    }
}

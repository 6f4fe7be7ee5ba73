// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use async_trait::async_trait;
use basalt_models::{Address, BlockHeader};

use crate::error::ExecutorError;
use crate::types::ExecutionMessage;

/// Contract of the execution backend.
///
/// All operations are asynchronous: the backend may live in another process.
/// A [`ExecutorError::TermIdMismatch`] from any of them signals that the
/// backend moved to a newer consensus term and the caller must trigger a
/// view change.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Speculatively warms the backend for the given batch so a later
    /// `execute_transactions` can answer from cache.
    async fn pre_execute_transactions(
        &self,
        term_id: u64,
        header: &BlockHeader,
        shard: &Address,
        msgs: &[ExecutionMessage],
    ) -> Result<(), ExecutorError>;

    /// Executes a batch of messages for one shard, returning one output per
    /// message plus any continuation messages. An empty batch is valid and
    /// drains outputs cached by a preceding pre-execute.
    async fn execute_transactions(
        &self,
        shard: &Address,
        msgs: Vec<ExecutionMessage>,
    ) -> Result<Vec<ExecutionMessage>, ExecutorError>;

    /// Runs a single read-only call outside dispatch batching.
    async fn call(&self, msg: ExecutionMessage) -> Result<ExecutionMessage, ExecutorError>;
}

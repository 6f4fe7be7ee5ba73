// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! A scripted executor backend. Each operation answers from a programmable
//! queue, falling back to completing every message, and records its calls so
//! tests can assert on the interactions. A successful pre-execute caches the
//! batch: a later empty-batch execution drains the cache, mimicking a warmed
//! backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use basalt_models::{Address, BlockHeader};
use parking_lot::Mutex;

use crate::error::ExecutorError;
use crate::executor::Executor;
use crate::types::{ExecutionMessage, MessageType};

/// Scripted, recording executor backend.
#[derive(Default)]
pub struct MockExecutor {
    pre_execute_scripts: Mutex<VecDeque<Result<(), ExecutorError>>>,
    execute_scripts: Mutex<VecDeque<Result<Vec<ExecutionMessage>, ExecutorError>>>,
    call_scripts: Mutex<VecDeque<Result<ExecutionMessage, ExecutorError>>>,
    cache: Mutex<HashMap<Address, Vec<ExecutionMessage>>>,
    pre_executed: Mutex<Vec<(u64, Address, usize)>>,
    executed: Mutex<Vec<(Address, Vec<ExecutionMessage>)>>,
    called: Mutex<Vec<ExecutionMessage>>,
}

impl MockExecutor {
    /// Creates a permissive executor completing everything it is handed.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues the answer for the next `pre_execute_transactions` call.
    pub fn queue_pre_execute_result(&self, result: Result<(), ExecutorError>) {
        self.pre_execute_scripts.lock().push_back(result);
    }

    /// Queues the answer for the next `execute_transactions` call.
    pub fn queue_execute_result(&self, result: Result<Vec<ExecutionMessage>, ExecutorError>) {
        self.execute_scripts.lock().push_back(result);
    }

    /// Queues the answer for the next `call`.
    pub fn queue_call_result(&self, result: Result<ExecutionMessage, ExecutorError>) {
        self.call_scripts.lock().push_back(result);
    }

    /// Every recorded pre-execute as `(term_id, shard, batch size)`.
    pub fn pre_executed(&self) -> Vec<(u64, Address, usize)> {
        self.pre_executed.lock().clone()
    }

    /// Every recorded batch execution as `(shard, batch)`.
    pub fn executed(&self) -> Vec<(Address, Vec<ExecutionMessage>)> {
        self.executed.lock().clone()
    }

    /// Every recorded static call.
    pub fn called(&self) -> Vec<ExecutionMessage> {
        self.called.lock().clone()
    }

    fn finish(mut msg: ExecutionMessage) -> ExecutionMessage {
        msg.message_type = MessageType::Finished;
        msg
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn pre_execute_transactions(
        &self,
        term_id: u64,
        _header: &BlockHeader,
        shard: &Address,
        msgs: &[ExecutionMessage],
    ) -> Result<(), ExecutorError> {
        self.pre_executed
            .lock()
            .push((term_id, shard.clone(), msgs.len()));
        if let Some(scripted) = self.pre_execute_scripts.lock().pop_front() {
            scripted?;
        }
        self.cache.lock().insert(shard.clone(), msgs.to_vec());
        Ok(())
    }

    async fn execute_transactions(
        &self,
        shard: &Address,
        msgs: Vec<ExecutionMessage>,
    ) -> Result<Vec<ExecutionMessage>, ExecutorError> {
        self.executed.lock().push((shard.clone(), msgs.clone()));
        if let Some(scripted) = self.execute_scripts.lock().pop_front() {
            return scripted;
        }
        let batch = if msgs.is_empty() {
            self.cache.lock().remove(shard).unwrap_or_default()
        } else {
            msgs
        };
        Ok(batch.into_iter().map(Self::finish).collect())
    }

    async fn call(&self, msg: ExecutionMessage) -> Result<ExecutionMessage, ExecutorError> {
        self.called.lock().push(msg.clone());
        if let Some(scripted) = self.call_scripts.lock().pop_front() {
            return scripted;
        }
        Ok(Self::finish(msg))
    }
}

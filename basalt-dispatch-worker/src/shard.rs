// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::sync::Arc;

use basalt_dispatch_exports::{
    DispatchError, DispatchStatus, ExecutionMessage, Executor, ExecutorError,
};
use basalt_models::{Address, BlockHeader};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::dmc::{DmcCore, ForwardSink, TxFinishedHook};

/// Callback invoked when the executor signals a consensus view change.
pub type SwitchHook = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle of a dispatcher within one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShardPhase {
    Idle,
    Staging,
    PreExecuting,
    Dispatching,
    Finished,
    Paused,
    Error,
}

/// Dispatcher of execution messages for one shard (contract address) within
/// one block.
///
/// Messages are staged by `submit`, optionally shipped early by
/// `pre_execute`, and dispatched by `shard_go`. The async pre-execute lock
/// is held across the executor round-trip, so at most one pre-execute is in
/// flight and a dispatch only starts after it completed.
pub struct ShardDispatcher {
    contract_address: Address,
    header: BlockHeader,
    term_id: u64,
    executor: Arc<dyn Executor>,
    core: DmcCore,
    prepared_messages: Mutex<Option<Vec<ExecutionMessage>>>,
    pre_execute_lock: tokio::sync::Mutex<()>,
    phase: Mutex<ShardPhase>,
    on_switch: SwitchHook,
}

impl ShardDispatcher {
    /// Creates the dispatcher for one shard of a block.
    pub fn new(
        contract_address: Address,
        header: BlockHeader,
        term_id: u64,
        executor: Arc<dyn Executor>,
        on_tx_finished: TxFinishedHook,
        forward: ForwardSink,
        on_switch: SwitchHook,
    ) -> Self {
        let core = DmcCore::new(contract_address.clone(), on_tx_finished, forward);
        ShardDispatcher {
            contract_address,
            header,
            term_id,
            executor,
            core,
            prepared_messages: Mutex::new(None),
            pre_execute_lock: tokio::sync::Mutex::new(()),
            phase: Mutex::new(ShardPhase::Idle),
            on_switch,
        }
    }

    /// The shard this dispatcher serves.
    pub fn contract_address(&self) -> &Address {
        &self.contract_address
    }

    /// The shard's DMC core.
    pub fn core(&self) -> &DmcCore {
        &self.core
    }

    pub(crate) fn phase(&self) -> ShardPhase {
        *self.phase.lock()
    }

    /// Stages a message for the next dispatch.
    pub fn submit(&self, mut msg: ExecutionMessage) {
        self.core.handle_create_message(&mut msg);
        let mut prepared = self.prepared_messages.lock();
        prepared.get_or_insert_with(Vec::new).push(msg);
        *self.phase.lock() = ShardPhase::Staging;
    }

    /// Whether messages are staged and not yet taken by pre-execute or
    /// dispatch.
    pub fn has_prepared_messages(&self) -> bool {
        self.prepared_messages
            .lock()
            .as_ref()
            .map_or(false, |msgs| !msgs.is_empty())
    }

    /// Speculatively ships the staged batch so the executor can warm its
    /// state. On failure the batch is restored and the synchronous dispatch
    /// path retries with it; errors are therefore not surfaced here.
    pub async fn pre_execute(&self) {
        let _guard = self.pre_execute_lock.lock().await;
        let Some(batch) = self.prepared_messages.lock().take() else {
            return;
        };
        if batch.is_empty() {
            return;
        }
        *self.phase.lock() = ShardPhase::PreExecuting;
        debug!(
            "pre-executing {} messages on shard {} for block {}",
            batch.len(),
            self.contract_address,
            self.header.number
        );
        match self
            .executor
            .pre_execute_transactions(self.term_id, &self.header, &self.contract_address, &batch)
            .await
        {
            Ok(()) => {
                debug!("pre-execute succeeded on shard {}", self.contract_address);
            }
            Err(err) => {
                debug!(
                    "pre-execute failed on shard {}: {}",
                    self.contract_address, err
                );
                *self.prepared_messages.lock() = Some(batch);
                *self.phase.lock() = ShardPhase::Staging;
            }
        }
    }

    /// Dispatches the staged batch, waiting out any in-flight pre-execute.
    pub async fn shard_go(&self) -> Result<DispatchStatus, DispatchError> {
        let _guard = self.pre_execute_lock.lock().await;
        let taken = self.prepared_messages.lock().take();
        *self.phase.lock() = ShardPhase::Dispatching;

        let single_static = taken
            .as_ref()
            .map_or(false, |msgs| msgs.len() == 1 && msgs[0].static_call);
        if single_static {
            let mut msgs = taken.unwrap_or_default();
            let msg = msgs.remove(0);
            trace!(
                "sending call request on shard {} to {} context {}",
                self.contract_address,
                msg.to,
                msg.context_id
            );
            return match self.executor.call(msg).await {
                Ok(output) => {
                    self.core.finish_transaction(output);
                    *self.phase.lock() = ShardPhase::Paused;
                    Ok(DispatchStatus::Paused)
                }
                Err(err) => Err(self.fail(err)),
            };
        }

        let batch = match taken {
            Some(batch) => batch,
            None => {
                // consumed by pre-execute: an empty batch still runs so the
                // executor drains its cached completions
                debug!(
                    "dispatching shard {} from the pre-execute cache",
                    self.contract_address
                );
                Vec::new()
            }
        };
        debug!(
            "dispatching {} messages on shard {} for block {}",
            batch.len(),
            self.contract_address,
            self.header.number
        );
        match self.executor.execute_transactions(&self.contract_address, batch).await {
            Ok(outputs) => {
                self.handle_shard_go_output(outputs);
                *self.phase.lock() = ShardPhase::Finished;
                Ok(DispatchStatus::Finished)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&self, err: ExecutorError) -> DispatchError {
        warn!(
            "executor error on shard {}: {}",
            self.contract_address, err
        );
        if err.is_term_id_mismatch() {
            (self.on_switch)();
        }
        *self.phase.lock() = ShardPhase::Error;
        DispatchError::Executor(err)
    }

    /// Partitions a dispatch round's outputs: terminal outputs complete
    /// their transactions, the rest continue through the call graph.
    fn handle_shard_go_output(&self, outputs: Vec<ExecutionMessage>) {
        let mut continuations = Vec::new();
        for output in outputs {
            if output.is_terminal() {
                self.core.finish_transaction(output);
            } else {
                continuations.push(output);
            }
        }
        self.handle_executive_outputs(continuations);
    }

    /// Ensures each continuation has an executive state, then hands the
    /// batch to the common routing core.
    fn handle_executive_outputs(&self, mut outputs: Vec<ExecutionMessage>) {
        for msg in outputs.iter_mut() {
            self.core
                .executive_pool()
                .with_state(msg.context_id, |state, created| {
                    if created {
                        msg.seq = state.begin_call();
                    }
                });
        }
        self.core.handle_executive_outputs(outputs);
    }

    /// Whether every context tracked by this shard is complete or parked.
    pub fn drained(&self) -> bool {
        self.core.drained()
    }
}

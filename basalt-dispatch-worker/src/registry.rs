// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use basalt_dispatch_exports::{DispatchError, DispatchStatus, ExecutionMessage, Executor};
use basalt_models::{Address, BlockHeader};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::dmc::{ForwardSink, TxFinishedHook};
use crate::shard::{ShardDispatcher, SwitchHook};

/// The per-block registry of shard dispatchers.
///
/// Dispatchers are created lazily as messages surface new shards.
/// Continuation messages forwarded by any dispatcher are queued here and
/// routed to their destination shard between dispatch rounds.
pub struct ShardRegistry {
    header: BlockHeader,
    term_id: u64,
    executor: Arc<dyn Executor>,
    dispatchers: Mutex<BTreeMap<Address, Arc<ShardDispatcher>>>,
    pending: Arc<Mutex<VecDeque<ExecutionMessage>>>,
    on_tx_finished: TxFinishedHook,
    on_switch: SwitchHook,
}

impl ShardRegistry {
    /// Creates the registry for one block.
    pub fn new(
        header: BlockHeader,
        term_id: u64,
        executor: Arc<dyn Executor>,
        on_tx_finished: TxFinishedHook,
        on_switch: SwitchHook,
    ) -> Self {
        ShardRegistry {
            header,
            term_id,
            executor,
            dispatchers: Mutex::new(BTreeMap::new()),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            on_tx_finished,
            on_switch,
        }
    }

    /// The dispatcher of the given shard, created on first sight.
    pub fn dispatcher(&self, shard: &Address) -> Arc<ShardDispatcher> {
        let mut dispatchers = self.dispatchers.lock();
        if let Some(dispatcher) = dispatchers.get(shard) {
            return dispatcher.clone();
        }
        debug!(
            "creating dispatcher for shard {} in block {}",
            shard, self.header.number
        );
        let pending = self.pending.clone();
        let forward: ForwardSink = Arc::new(move |msg| pending.lock().push_back(msg));
        let dispatcher = Arc::new(ShardDispatcher::new(
            shard.clone(),
            self.header.clone(),
            self.term_id,
            self.executor.clone(),
            self.on_tx_finished.clone(),
            forward,
            self.on_switch.clone(),
        ));
        dispatchers.insert(shard.clone(), dispatcher.clone());
        dispatcher
    }

    /// Stages a scheduler message with the dispatcher of its target shard.
    pub fn submit(&self, msg: ExecutionMessage) {
        let shard = msg.to.clone();
        self.dispatcher(&shard).submit(msg);
    }

    /// Speculatively pre-executes every staged shard.
    pub async fn pre_execute_all(&self) {
        for dispatcher in self.snapshot() {
            dispatcher.pre_execute().await;
        }
    }

    fn snapshot(&self) -> Vec<Arc<ShardDispatcher>> {
        self.dispatchers.lock().values().cloned().collect()
    }

    /// Drives dispatch rounds until no shard has work left, routing
    /// continuations between rounds. Returns the final status of every
    /// shard; the first executor error abandons the block.
    pub async fn dispatch_block(
        &self,
    ) -> Result<BTreeMap<Address, DispatchStatus>, DispatchError> {
        let mut statuses = BTreeMap::new();
        let mut rounds = 0usize;
        let mut first_round = true;
        loop {
            // route continuations staged by the previous round
            loop {
                let msg = self.pending.lock().pop_front();
                match msg {
                    Some(msg) => self.submit(msg),
                    None => break,
                }
            }

            // every dispatcher runs at least once: a batch consumed by
            // pre-execute leaves nothing staged yet must still dispatch
            let active: Vec<Arc<ShardDispatcher>> = if first_round {
                self.snapshot()
            } else {
                self.snapshot()
                    .into_iter()
                    .filter(|dispatcher| dispatcher.has_prepared_messages())
                    .collect()
            };
            first_round = false;
            if active.is_empty() {
                break;
            }
            rounds += 1;

            let results =
                futures::future::join_all(active.iter().map(|dispatcher| dispatcher.shard_go()))
                    .await;
            for (dispatcher, result) in active.iter().zip(results) {
                let shard = dispatcher.contract_address().clone();
                match result {
                    Ok(status) => {
                        statuses.insert(shard, status);
                    }
                    Err(err) => {
                        warn!(
                            "abandoning block {} after shard {} failed: {}",
                            self.header.number, shard, err
                        );
                        return Err(err);
                    }
                }
            }
        }
        if !self.drained() {
            info!(
                "block {} dispatched with contexts parked on key locks",
                self.header.number
            );
        }
        debug!(
            "block {} dispatched over {} rounds across {} shards",
            self.header.number,
            rounds,
            statuses.len()
        );
        Ok(statuses)
    }

    /// Whether no continuation is queued and every shard's contexts are
    /// complete or parked.
    pub fn drained(&self) -> bool {
        self.pending.lock().is_empty()
            && self
                .snapshot()
                .iter()
                .all(|dispatcher| dispatcher.drained())
    }
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! The dispatch loop shared by every shard dispatcher: context bookkeeping
//! for staged messages and the routing of executor outputs through the call
//! graph.

use std::sync::Arc;

use basalt_dispatch_exports::{ExecutionMessage, MessageType};
use basalt_models::Address;
use tracing::trace;

use crate::executive_pool::ExecutivePool;

/// Sink receiving the final output of each completed transaction.
pub type TxFinishedHook = Arc<dyn Fn(ExecutionMessage) + Send + Sync>;

/// Sink receiving continuation messages bound for other shards; the block
/// scheduler routes them to the destination dispatcher.
pub type ForwardSink = Arc<dyn Fn(ExecutionMessage) + Send + Sync>;

/// The common dispatch core: owns the shard's executive pool and routes each
/// output by `(to, type)`. Shard dispatchers layer batching strategies on
/// top of it.
pub struct DmcCore {
    shard: Address,
    executive_pool: ExecutivePool,
    on_tx_finished: TxFinishedHook,
    forward: ForwardSink,
}

impl DmcCore {
    /// Creates the core for one shard.
    pub fn new(shard: Address, on_tx_finished: TxFinishedHook, forward: ForwardSink) -> Self {
        DmcCore {
            shard,
            executive_pool: ExecutivePool::new(),
            on_tx_finished,
            forward,
        }
    }

    /// The shard this core serves.
    pub fn shard(&self) -> &Address {
        &self.shard
    }

    /// The shard's executive pool.
    pub fn executive_pool(&self) -> &ExecutivePool {
        &self.executive_pool
    }

    /// Context bookkeeping for a message entering staging: a first-seen
    /// context gets a state, an opening call and its sequence number stamped
    /// onto the message.
    pub fn handle_create_message(&self, msg: &mut ExecutionMessage) {
        let context_id = msg.context_id;
        self.executive_pool.with_state(context_id, |state, created| {
            if created {
                msg.seq = state.begin_call();
            }
            state.last_message = Some(msg.clone());
        });
    }

    /// Routes a batch of continuation outputs.
    pub fn handle_executive_outputs(&self, outputs: Vec<ExecutionMessage>) {
        for output in outputs {
            self.route_output(output);
        }
    }

    fn route_output(&self, msg: ExecutionMessage) {
        trace!(
            "routing output of context {} seq {} on shard {}: {:?} -> {}",
            msg.context_id,
            msg.seq,
            self.shard,
            msg.message_type,
            msg.to
        );
        match msg.message_type {
            MessageType::Finished | MessageType::Revert => {
                // a nested call unwound; the transaction completes when the
                // stack empties, otherwise the output resumes the caller
                if self.executive_pool.end_call(msg.context_id) {
                    self.finish_transaction(msg);
                } else {
                    (self.forward)(msg);
                }
            }
            MessageType::KeyLock => {
                self.executive_pool.park(msg.context_id, msg);
            }
            MessageType::SendBack => {
                // the context leaves this shard for good: close the local
                // frame, the destination tracks its own
                if self.executive_pool.end_call(msg.context_id) {
                    self.executive_pool.remove(msg.context_id);
                }
                (self.forward)(msg);
            }
            MessageType::Message => {
                // a sub-call fans out; the local frame stays open awaiting
                // its return
                (self.forward)(msg);
            }
        }
    }

    /// Completes a transaction: drops its executive state and delivers the
    /// final output.
    pub fn finish_transaction(&self, msg: ExecutionMessage) {
        self.executive_pool.remove(msg.context_id);
        (self.on_tx_finished)(msg);
    }

    /// Whether every tracked context is complete or parked.
    pub fn drained(&self) -> bool {
        self.executive_pool.drained()
    }
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::collections::HashMap;

use basalt_dispatch_exports::ExecutionMessage;
use parking_lot::Mutex;

/// Per-context execution state: the call stack of one transaction's call
/// tree within a shard.
#[derive(Debug, Clone)]
pub struct ExecutiveState {
    /// Context this state belongs to.
    pub context_id: u64,
    /// Next sequence number to hand out.
    pub current_seq: u32,
    /// Outstanding call sequence numbers, innermost last.
    pub call_stack: Vec<u32>,
    /// Last message seen for this context.
    pub last_message: Option<ExecutionMessage>,
    /// Whether the context is parked on a key lock.
    pub parked: bool,
}

impl ExecutiveState {
    fn new(context_id: u64) -> Self {
        ExecutiveState {
            context_id,
            current_seq: 0,
            call_stack: Vec::new(),
            last_message: None,
            parked: false,
        }
    }

    /// Opens a nested call, returning its sequence number.
    pub fn begin_call(&mut self) -> u32 {
        let seq = self.current_seq;
        self.current_seq += 1;
        self.call_stack.push(seq);
        seq
    }

    /// Closes the innermost call.
    pub fn end_call(&mut self) {
        self.call_stack.pop();
    }

    /// Whether no call is outstanding: the transaction is complete.
    pub fn is_done(&self) -> bool {
        self.call_stack.is_empty()
    }
}

/// The per-shard map of context id to [`ExecutiveState`]. States are created
/// lazily on first sight of a context and removed when its transaction
/// completes.
#[derive(Default)]
pub struct ExecutivePool {
    states: Mutex<HashMap<u64, ExecutiveState>>,
}

impl ExecutivePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` on the context's state, creating it first when absent; the
    /// second argument tells `f` whether this call created the state.
    pub fn with_state<R>(
        &self,
        context_id: u64,
        f: impl FnOnce(&mut ExecutiveState, bool) -> R,
    ) -> R {
        let mut states = self.states.lock();
        match states.entry(context_id) {
            std::collections::hash_map::Entry::Occupied(mut entry) => f(entry.get_mut(), false),
            std::collections::hash_map::Entry::Vacant(slot) => {
                f(slot.insert(ExecutiveState::new(context_id)), true)
            }
        }
    }

    /// Closes the context's innermost call; true when the transaction is
    /// thereby complete (or was never tracked here).
    pub fn end_call(&self, context_id: u64) -> bool {
        let mut states = self.states.lock();
        match states.get_mut(&context_id) {
            Some(state) => {
                state.end_call();
                state.is_done()
            }
            None => true,
        }
    }

    /// Parks the context on a key lock, remembering the blocking message.
    pub fn park(&self, context_id: u64, msg: ExecutionMessage) {
        self.with_state(context_id, |state, _| {
            state.parked = true;
            state.last_message = Some(msg);
        });
    }

    /// Forgets the context.
    pub fn remove(&self, context_id: u64) -> Option<ExecutiveState> {
        self.states.lock().remove(&context_id)
    }

    /// Snapshot of one context's state.
    pub fn state_of(&self, context_id: u64) -> Option<ExecutiveState> {
        self.states.lock().get(&context_id).cloned()
    }

    /// Number of tracked contexts.
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    /// Whether no context is tracked.
    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }

    /// Whether every tracked context is complete or parked on an external
    /// event.
    pub fn drained(&self) -> bool {
        self.states
            .lock()
            .values()
            .all(|state| state.parked || state.is_done())
    }
}

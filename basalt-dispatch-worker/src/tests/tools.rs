// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::sync::Arc;

use basalt_dispatch_exports::test_exports::MockExecutor;
use basalt_dispatch_exports::{ExecutionMessage, MessageType};
use basalt_models::{Address, BlockHeader, Hash, Timestamp};
use parking_lot::Mutex;

use crate::dmc::{ForwardSink, TxFinishedHook};
use crate::shard::{ShardDispatcher, SwitchHook};
use crate::ShardRegistry;

pub const SHARD_A: &str = "0xshard-a";
pub const SHARD_B: &str = "0xshard-b";

pub fn test_header() -> BlockHeader {
    BlockHeader {
        number: 10,
        hash: Hash::from_bytes([10; 32]),
        timestamp: Timestamp::now(),
    }
}

/// A plain call message targeting `to`.
pub fn message(context_id: u64, to: &str) -> ExecutionMessage {
    ExecutionMessage {
        context_id,
        seq: 0,
        from: Address::new("0xorigin"),
        to: Address::new(to),
        message_type: MessageType::Message,
        static_call: false,
        internal_call: false,
        key_lock: None,
        data: Vec::new(),
    }
}

pub fn typed_message(context_id: u64, to: &str, message_type: MessageType) -> ExecutionMessage {
    ExecutionMessage {
        message_type,
        ..message(context_id, to)
    }
}

pub fn static_call_message(context_id: u64, to: &str) -> ExecutionMessage {
    ExecutionMessage {
        static_call: true,
        ..message(context_id, to)
    }
}

pub struct DispatcherHarness {
    pub executor: Arc<MockExecutor>,
    pub dispatcher: ShardDispatcher,
    pub finished: Arc<Mutex<Vec<ExecutionMessage>>>,
    pub forwarded: Arc<Mutex<Vec<ExecutionMessage>>>,
    pub switch_count: Arc<Mutex<u32>>,
}

/// A dispatcher for `SHARD_A` wired to recording sinks.
pub fn dispatcher_harness() -> DispatcherHarness {
    let executor = MockExecutor::new();
    let finished: Arc<Mutex<Vec<ExecutionMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let forwarded: Arc<Mutex<Vec<ExecutionMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let switch_count: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));

    let on_tx_finished: TxFinishedHook = {
        let finished = finished.clone();
        Arc::new(move |msg| finished.lock().push(msg))
    };
    let forward: ForwardSink = {
        let forwarded = forwarded.clone();
        Arc::new(move |msg| forwarded.lock().push(msg))
    };
    let on_switch: SwitchHook = {
        let switch_count = switch_count.clone();
        Arc::new(move || *switch_count.lock() += 1)
    };

    let dispatcher = ShardDispatcher::new(
        Address::new(SHARD_A),
        test_header(),
        1,
        executor.clone(),
        on_tx_finished,
        forward,
        on_switch,
    );
    DispatcherHarness {
        executor,
        dispatcher,
        finished,
        forwarded,
        switch_count,
    }
}

pub struct RegistryHarness {
    pub executor: Arc<MockExecutor>,
    pub registry: ShardRegistry,
    pub finished: Arc<Mutex<Vec<ExecutionMessage>>>,
    pub switch_count: Arc<Mutex<u32>>,
}

/// A registry wired to recording sinks.
pub fn registry_harness() -> RegistryHarness {
    let executor = MockExecutor::new();
    let finished: Arc<Mutex<Vec<ExecutionMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let switch_count: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));

    let on_tx_finished: TxFinishedHook = {
        let finished = finished.clone();
        Arc::new(move |msg| finished.lock().push(msg))
    };
    let on_switch: SwitchHook = {
        let switch_count = switch_count.clone();
        Arc::new(move || *switch_count.lock() += 1)
    };

    let registry = ShardRegistry::new(test_header(), 1, executor.clone(), on_tx_finished, on_switch);
    RegistryHarness {
        executor,
        registry,
        finished,
        switch_count,
    }
}

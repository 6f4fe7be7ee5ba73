// Copyright (c) 2023 BASALT LABS <info@basalt.systems>
//! Dispatcher unit tests against the scripted executor backend.

use basalt_dispatch_exports::{
    DispatchError, DispatchStatus, ExecutorError, MessageType,
};
use basalt_models::Address;

use super::tools::{
    dispatcher_harness, message, static_call_message, typed_message, SHARD_A, SHARD_B,
};
use crate::dmc::DmcCore;
use crate::shard::ShardPhase;

#[tokio::test]
async fn submit_opens_the_context_call_stack() {
    let harness = dispatcher_harness();
    harness.dispatcher.submit(message(7, SHARD_A));
    let state = harness
        .dispatcher
        .core()
        .executive_pool()
        .state_of(7)
        .unwrap();
    assert_eq!(state.call_stack, vec![0]);
    assert_eq!(state.current_seq, 1);
    assert_eq!(harness.dispatcher.phase(), ShardPhase::Staging);

    harness.dispatcher.shard_go().await.unwrap();
    // the staged message carried the stamped sequence number
    let executed = harness.executor.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].1[0].seq, 0);
}

#[tokio::test]
async fn single_static_call_takes_the_fast_path() {
    let harness = dispatcher_harness();
    harness.dispatcher.submit(static_call_message(1, SHARD_A));

    let status = harness.dispatcher.shard_go().await.unwrap();
    assert_eq!(status, DispatchStatus::Paused);
    assert_eq!(harness.dispatcher.phase(), ShardPhase::Paused);
    // the batched entry point is never touched
    assert_eq!(harness.executor.called().len(), 1);
    assert!(harness.executor.executed().is_empty());
    let finished = harness.finished.lock();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].context_id, 1);
}

#[tokio::test]
async fn two_static_calls_go_through_the_batch_path() {
    let harness = dispatcher_harness();
    harness.dispatcher.submit(static_call_message(1, SHARD_A));
    harness.dispatcher.submit(static_call_message(2, SHARD_A));

    let status = harness.dispatcher.shard_go().await.unwrap();
    assert_eq!(status, DispatchStatus::Finished);
    assert!(harness.executor.called().is_empty());
    assert_eq!(harness.executor.executed().len(), 1);
}

#[tokio::test]
async fn static_call_term_mismatch_triggers_the_switch() {
    let harness = dispatcher_harness();
    harness
        .executor
        .queue_call_result(Err(ExecutorError::TermIdMismatch("term 2 expected".into())));
    harness.dispatcher.submit(static_call_message(1, SHARD_A));

    let err = harness.dispatcher.shard_go().await.unwrap_err();
    assert!(err.is_term_id_mismatch());
    assert_eq!(*harness.switch_count.lock(), 1);
    assert_eq!(harness.dispatcher.phase(), ShardPhase::Error);
    assert!(harness.finished.lock().is_empty());
}

#[tokio::test]
async fn batch_term_mismatch_triggers_the_switch_once() {
    let harness = dispatcher_harness();
    harness
        .executor
        .queue_execute_result(Err(ExecutorError::TermIdMismatch("term 2 expected".into())));
    harness.dispatcher.submit(message(1, SHARD_A));
    harness.dispatcher.submit(message(2, SHARD_A));

    match harness.dispatcher.shard_go().await {
        Err(DispatchError::Executor(ExecutorError::TermIdMismatch(_))) => {}
        other => panic!("expected term mismatch, got {:?}", other),
    }
    assert_eq!(*harness.switch_count.lock(), 1);
    assert_eq!(harness.dispatcher.phase(), ShardPhase::Error);
}

#[tokio::test]
async fn transient_executor_error_does_not_switch() {
    let harness = dispatcher_harness();
    harness
        .executor
        .queue_execute_result(Err(ExecutorError::Unavailable("backend restarting".into())));
    harness.dispatcher.submit(message(1, SHARD_A));

    assert!(harness.dispatcher.shard_go().await.is_err());
    assert_eq!(*harness.switch_count.lock(), 0);
}

#[tokio::test]
async fn pre_execute_failure_restores_the_batch() {
    let harness = dispatcher_harness();
    harness
        .executor
        .queue_pre_execute_result(Err(ExecutorError::Unavailable("backend restarting".into())));
    for context_id in 1..=3 {
        harness.dispatcher.submit(message(context_id, SHARD_A));
    }

    harness.dispatcher.pre_execute().await;
    // the batch must be observable again for the synchronous path
    assert!(harness.dispatcher.has_prepared_messages());
    assert_eq!(harness.dispatcher.phase(), ShardPhase::Staging);

    let status = harness.dispatcher.shard_go().await.unwrap();
    assert_eq!(status, DispatchStatus::Finished);
    let executed = harness.executor.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].1.len(), 3);
    assert_eq!(harness.finished.lock().len(), 3);
}

#[tokio::test]
async fn dispatch_after_pre_execute_sends_an_empty_batch() {
    let harness = dispatcher_harness();
    harness.dispatcher.submit(message(1, SHARD_A));
    harness.dispatcher.submit(message(2, SHARD_A));

    harness.dispatcher.pre_execute().await;
    assert!(!harness.dispatcher.has_prepared_messages());
    assert_eq!(harness.executor.pre_executed().len(), 1);

    // the executor must still be invoked to drain its cache
    let status = harness.dispatcher.shard_go().await.unwrap();
    assert_eq!(status, DispatchStatus::Finished);
    let executed = harness.executor.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].1.is_empty());
    assert_eq!(harness.finished.lock().len(), 2);
}

#[tokio::test]
async fn outputs_partition_into_finished_and_continuations() {
    let harness = dispatcher_harness();
    harness.dispatcher.submit(message(1, SHARD_A));
    harness.executor.queue_execute_result(Ok(vec![
        typed_message(1, SHARD_A, MessageType::Finished),
        message(2, SHARD_B),
        typed_message(3, SHARD_A, MessageType::Revert),
    ]));

    let status = harness.dispatcher.shard_go().await.unwrap();
    assert_eq!(status, DispatchStatus::Finished);

    let finished = harness.finished.lock();
    assert_eq!(finished.len(), 2);
    assert!(finished.iter().any(|msg| msg.context_id == 1));
    assert!(finished.iter().any(|msg| msg.context_id == 3));

    let forwarded = harness.forwarded.lock();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].context_id, 2);
    assert_eq!(forwarded[0].to, Address::new(SHARD_B));

    // the continuation got an executive state with its opening call
    let state = harness
        .dispatcher
        .core()
        .executive_pool()
        .state_of(2)
        .unwrap();
    assert_eq!(state.call_stack, vec![0]);
    // the finished context's state is gone
    assert!(harness
        .dispatcher
        .core()
        .executive_pool()
        .state_of(1)
        .is_none());
}

#[tokio::test]
async fn nested_finishes_unwind_the_call_stack() {
    let harness = dispatcher_harness();
    let core: &DmcCore = harness.dispatcher.core();
    core.executive_pool().with_state(9, |state, _| {
        state.begin_call();
        state.begin_call();
    });

    core.handle_executive_outputs(vec![typed_message(9, SHARD_A, MessageType::Finished)]);
    // one call popped: the output resumes the caller instead of finishing
    assert!(harness.finished.lock().is_empty());
    assert_eq!(harness.forwarded.lock().len(), 1);
    assert!(!core.executive_pool().state_of(9).unwrap().is_done());

    core.handle_executive_outputs(vec![typed_message(9, SHARD_A, MessageType::Finished)]);
    assert_eq!(harness.finished.lock().len(), 1);
    assert!(core.executive_pool().state_of(9).is_none());
}

#[tokio::test]
async fn key_lock_parks_the_context() {
    let harness = dispatcher_harness();
    harness.dispatcher.submit(message(5, SHARD_A));
    let mut locked = typed_message(5, SHARD_A, MessageType::KeyLock);
    locked.key_lock = Some(b"balance:0xabc".to_vec());
    harness.executor.queue_execute_result(Ok(vec![locked]));

    harness.dispatcher.shard_go().await.unwrap();
    let state = harness
        .dispatcher
        .core()
        .executive_pool()
        .state_of(5)
        .unwrap();
    assert!(state.parked);
    assert!(harness.finished.lock().is_empty());
    assert!(harness.forwarded.lock().is_empty());
    // parked contexts count as blocked, not as pending work
    assert!(harness.dispatcher.drained());
}

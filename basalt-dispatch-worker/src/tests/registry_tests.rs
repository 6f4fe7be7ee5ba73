// Copyright (c) 2023 BASALT LABS <info@basalt.systems>
//! Block-level dispatch scenarios across lazily created shard dispatchers.

use basalt_dispatch_exports::{DispatchStatus, ExecutorError, MessageType};
use basalt_models::Address;

use super::tools::{message, registry_harness, typed_message, SHARD_A, SHARD_B};

#[tokio::test]
async fn cross_shard_call_returns_and_terminates() {
    let harness = registry_harness();
    // shard A's execution spawns a sub-call on shard B; shard B answers it
    // back to A, whose next round completes the transaction
    harness
        .executor
        .queue_execute_result(Ok(vec![message(1, SHARD_B)]));
    harness
        .executor
        .queue_execute_result(Ok(vec![typed_message(1, SHARD_A, MessageType::SendBack)]));
    harness.registry.submit(message(1, SHARD_A));

    let statuses = harness.registry.dispatch_block().await.unwrap();
    assert_eq!(
        statuses.get(&Address::new(SHARD_A)),
        Some(&DispatchStatus::Finished)
    );
    assert_eq!(
        statuses.get(&Address::new(SHARD_B)),
        Some(&DispatchStatus::Finished)
    );
    // exactly one transaction completed, at its origin shard
    let finished = harness.finished.lock();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].context_id, 1);
    drop(finished);
    assert!(harness.registry.drained());
}

#[tokio::test]
async fn dispatchers_are_created_lazily_per_shard() {
    let harness = registry_harness();
    harness.registry.submit(message(1, SHARD_A));
    harness.registry.submit(message(2, SHARD_A));
    harness.registry.submit(message(3, SHARD_B));

    let statuses = harness.registry.dispatch_block().await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(harness.finished.lock().len(), 3);
    // one batch per shard
    assert_eq!(harness.executor.executed().len(), 2);
}

#[tokio::test]
async fn term_mismatch_abandons_the_block() {
    let harness = registry_harness();
    harness
        .executor
        .queue_execute_result(Err(ExecutorError::TermIdMismatch("term 3 expected".into())));
    harness.registry.submit(message(1, SHARD_A));

    assert!(harness.registry.dispatch_block().await.is_err());
    assert_eq!(*harness.switch_count.lock(), 1);
    assert!(harness.finished.lock().is_empty());
}

#[tokio::test]
async fn pre_executed_shards_still_dispatch() {
    let harness = registry_harness();
    harness.registry.submit(message(1, SHARD_A));
    harness.registry.submit(message(2, SHARD_B));

    harness.registry.pre_execute_all().await;
    assert_eq!(harness.executor.pre_executed().len(), 2);

    // both batches were consumed by pre-execute; the first round still
    // dispatches every shard so the executor drains its caches
    let statuses = harness.registry.dispatch_block().await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert_eq!(harness.finished.lock().len(), 2);
    for (_, batch) in harness.executor.executed() {
        assert!(batch.is_empty());
    }
}

#[tokio::test]
async fn empty_block_terminates_immediately() {
    let harness = registry_harness();
    let statuses = harness.registry.dispatch_block().await.unwrap();
    assert!(statuses.is_empty());
    assert!(harness.registry.drained());
    assert!(harness.executor.executed().is_empty());
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>
//! Controller-level scenarios: the pool driven through the public traits
//! with the cleanup worker running.

use std::sync::Arc;
use std::time::Duration;

use basalt_models::{HashedSet, Timestamp};
use basalt_pool_exports::test_exports::{
    recording_notifier, MockLedgerNonceChecker, MockPoolNonceChecker, MockValidator,
};
use basalt_pool_exports::{
    PoolChannels, PoolConfig, TransactionStatus, TransactionSubmitResult,
};

use super::tools::test_tx;
use crate::start_pool_controller;

#[test]
fn controller_submit_fetch_commit() {
    let (unsealed_size_notifier, _sizes) = recording_notifier();
    let ledger_nonce_checker = MockLedgerNonceChecker::new();
    let (mut manager, controller) = start_pool_controller(
        PoolConfig::default(),
        MockValidator::new(),
        MockPoolNonceChecker::new(),
        ledger_nonce_checker.clone(),
        PoolChannels {
            unsealed_size_notifier,
            cleanup_switch: Some(Arc::new(|| false)),
        },
    );

    let tx = test_tx(0xAA);
    let hash = tx.hash;
    let nonce = tx.nonce.clone();
    let result_rx = controller.submit(tx).unwrap();

    let (normal, _) = controller.batch_fetch_txs(10, &HashedSet::default(), true);
    assert_eq!(normal.len(), 1);
    assert_eq!(controller.unsealed_txs_size(), 0);

    let result = TransactionSubmitResult::new(hash, TransactionStatus::None)
        .with_nonce(nonce.clone())
        .with_batch_id(1);
    controller.batch_remove(1, vec![result]);
    assert_eq!(controller.pending_txs_size(), 0);

    let delivered = result_rx.blocking_recv().unwrap();
    assert_eq!(delivered.status, TransactionStatus::None);
    assert_eq!(ledger_nonce_checker.inserted(), vec![(1, vec![nonce])]);

    manager.stop();
}

#[test]
fn cleanup_worker_expires_transactions() {
    let (unsealed_size_notifier, _sizes) = recording_notifier();
    let config = PoolConfig {
        tx_expiration: Timestamp::from_millis(0),
        cleanup_interval: Timestamp::from_millis(50),
        ..PoolConfig::default()
    };
    let (mut manager, controller) = start_pool_controller(
        config,
        MockValidator::new(),
        MockPoolNonceChecker::new(),
        MockLedgerNonceChecker::new(),
        PoolChannels {
            unsealed_size_notifier,
            cleanup_switch: None,
        },
    );

    controller.submit(test_tx(1)).unwrap();
    // a zero expiration window makes the transaction stale on the next tick
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(controller.pending_txs_size(), 0);

    manager.stop();
}

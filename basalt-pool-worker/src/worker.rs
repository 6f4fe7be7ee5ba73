// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Pool worker: spawns the cleanup timer thread and wires up the controller.

use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use basalt_pool_exports::{
    LedgerNonceChecker, PoolChannels, PoolConfig, PoolNonceChecker, TransactionValidator,
    TxPoolController, TxPoolManager,
};

use crate::controller_impl::{Command, TxPoolControllerImpl, TxPoolManagerImpl};
use crate::pool::TxPool;

/// Cleanup timer thread: runs the expiration sweep every tick until stopped.
pub(crate) struct CleanupThread {
    receiver: Receiver<Command>,
    pool: Arc<TxPool>,
}

impl CleanupThread {
    /// Spawns the cleanup thread, returning a join handle.
    pub(crate) fn spawn(
        receiver: Receiver<Command>,
        pool: Arc<TxPool>,
        config: PoolConfig,
    ) -> JoinHandle<()> {
        let thread_builder = thread::Builder::new().name("txpool-cleanup".into());
        thread_builder
            .spawn(move || {
                let this = Self { receiver, pool };
                this.run(config)
            })
            .expect("failed to spawn thread: txpool-cleanup")
    }

    /// Runs the thread.
    fn run(self, config: PoolConfig) {
        let tick = config.cleanup_interval.to_duration();
        loop {
            match self.receiver.recv_timeout(tick) {
                Err(RecvTimeoutError::Timeout) => self.pool.clean_up_expired(),
                Err(RecvTimeoutError::Disconnected) | Ok(Command::Stop) => break,
            }
        }
    }
}

/// Starts the pool manager and controller.
pub fn start_pool_controller(
    config: PoolConfig,
    validator: Arc<dyn TransactionValidator>,
    pool_nonce_checker: Arc<dyn PoolNonceChecker>,
    ledger_nonce_checker: Arc<dyn LedgerNonceChecker>,
    channels: PoolChannels,
) -> (Box<dyn TxPoolManager>, Box<dyn TxPoolController>) {
    let (command_sender, command_receiver) = sync_channel(16);
    let pool = Arc::new(TxPool::init(
        config,
        validator,
        pool_nonce_checker,
        ledger_nonce_checker,
        channels,
    ));
    let cleanup_thread_handle = CleanupThread::spawn(command_receiver, pool.clone(), config);

    let controller = TxPoolControllerImpl { pool };
    let manager = TxPoolManagerImpl {
        cleanup_thread_handle: Some(cleanup_thread_handle),
        command_sender,
    };
    (Box::new(manager), Box::new(controller))
}

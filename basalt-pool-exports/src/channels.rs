// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::sync::Arc;

use crate::error::PoolError;

/// Callback through which the pool reports its unsealed size to the sealer
/// after every mutation of sealed state. Failures are retried a bounded
/// number of times.
pub type UnsealedSizeNotifier = Arc<dyn Fn(usize) -> Result<(), PoolError> + Send + Sync>;

/// Predicate deciding whether the timer-driven expiration sweep runs on this
/// node. Consensus nodes expire lazily while sealing and leave this off.
pub type CleanupSwitch = Arc<dyn Fn() -> bool + Send + Sync>;

/// Runtime wiring handed to the pool worker.
#[derive(Clone)]
pub struct PoolChannels {
    /// Unsealed-size notification callback.
    pub unsealed_size_notifier: UnsealedSizeNotifier,
    /// Expiration-sweep switch. With no switch configured the sweep always
    /// runs.
    pub cleanup_switch: Option<CleanupSwitch>,
}

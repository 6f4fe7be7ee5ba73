// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use basalt_models::Timestamp;
use serde::{Deserialize, Serialize};

/// Transaction pool configuration.
#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct PoolConfig {
    /// Maximum number of pending transactions accepted from limit-checked
    /// submissions. Peer imports bypass this cap.
    pub pool_limit: usize,
    /// How long a transaction may wait in the pool before expiring.
    pub tx_expiration: Timestamp,
    /// Interval between two runs of the expiration sweep.
    pub cleanup_interval: Timestamp,
    /// Upper bound on entries traversed by one expiration sweep.
    pub max_sweep_traverse: usize,
    /// How many times a failed unsealed-size notification is retried.
    pub max_notify_retries: u32,
}

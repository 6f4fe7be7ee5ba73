// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use basalt_models::Timestamp;

use crate::config::PoolConfig;

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            pool_limit: 10_000,
            tx_expiration: Timestamp::from_millis(600_000),
            cleanup_interval: Timestamp::from_millis(3_000),
            max_sweep_traverse: 10_000,
            max_notify_retries: 3,
        }
    }
}

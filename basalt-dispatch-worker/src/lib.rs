// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Sharded dispatch of execution messages: one dispatcher per contract
//! address batches messages to the executor backend, speculatively
//! pre-executes, and drives the cross-contract call graph until every
//! transaction of a block terminates.

#![warn(missing_docs)]

mod dmc;
mod executive_pool;
mod registry;
mod shard;

pub use dmc::{DmcCore, ForwardSink, TxFinishedHook};
pub use executive_pool::{ExecutivePool, ExecutiveState};
pub use registry::ShardRegistry;
pub use shard::{ShardDispatcher, SwitchHook};

#[cfg(test)]
mod tests;

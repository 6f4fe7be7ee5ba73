// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! In-memory pool of pending signed transactions: ingestion from clients and
//! peers, proposal sealing, commit removal, expiration, and submitter
//! notification.

#![warn(missing_docs)]

mod controller_impl;
mod pool;
mod types;
mod worker;

pub use pool::TxPool;
pub use worker::start_pool_controller;

#[cfg(test)]
mod tests;

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Interface of the basalt transaction pool: configuration, status codes,
//! collaborator contracts and the controller traits exposed to the rest of
//! the node.

#![warn(missing_docs)]

mod channels;
mod config;
mod controller_traits;
mod error;
mod types;
mod validation;

pub use channels::{CleanupSwitch, PoolChannels, UnsealedSizeNotifier};
pub use config::PoolConfig;
pub use controller_traits::{TxPoolController, TxPoolManager};
pub use error::PoolError;
pub use types::{
    SubmitResultReceiver, SubmitResultSender, TransactionStatus, TransactionSubmitResult,
};
pub use validation::{LedgerNonceChecker, PoolNonceChecker, TransactionValidator};

#[cfg(feature = "testing")]
pub mod test_exports;

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Interface of the sharded execution dispatcher: execution messages, the
//! executor backend contract and the dispatch status/error types.

#![warn(missing_docs)]

mod error;
mod executor;
mod types;

pub use error::{DispatchError, ExecutorError};
pub use executor::Executor;
pub use types::{DispatchStatus, ExecutionMessage, MessageType};

#[cfg(feature = "testing")]
pub mod test_exports;

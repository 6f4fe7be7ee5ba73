// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Test tooling for pool consumers: recording mocks of the validation
//! collaborators and default configurations.

mod config;
mod mock;

pub use mock::{
    failing_notifier, recording_notifier, MockLedgerNonceChecker, MockPoolNonceChecker,
    MockValidator,
};

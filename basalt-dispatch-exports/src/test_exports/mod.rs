// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Test tooling for dispatch consumers: a scripted, recording executor
//! backend.

mod mock;

pub use mock::MockExecutor;

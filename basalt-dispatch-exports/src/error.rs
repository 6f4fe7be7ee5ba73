// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use displaydoc::Display;
use thiserror::Error;

/// Errors reported by the executor backend.
#[non_exhaustive]
#[derive(Clone, Display, Error, Debug)]
pub enum ExecutorError {
    /// scheduler term id mismatch: {0}
    TermIdMismatch(String),
    /// executor unavailable: {0}
    Unavailable(String),
    /// execution failed: {0}
    ExecutionFailed(String),
}

impl ExecutorError {
    /// Numeric code for cross-process reporting.
    pub const fn code(&self) -> i32 {
        match self {
            ExecutorError::TermIdMismatch(_) => 1,
            ExecutorError::Unavailable(_) => 2,
            ExecutorError::ExecutionFailed(_) => 3,
        }
    }

    /// Whether the error signals a consensus view change.
    pub fn is_term_id_mismatch(&self) -> bool {
        matches!(self, ExecutorError::TermIdMismatch(_))
    }
}

/// Errors of the dispatch layer.
#[non_exhaustive]
#[derive(Clone, Display, Error, Debug)]
pub enum DispatchError {
    /// executor error: {0}
    Executor(#[from] ExecutorError),
}

impl DispatchError {
    /// Whether the underlying failure signals a consensus view change.
    pub fn is_term_id_mismatch(&self) -> bool {
        match self {
            DispatchError::Executor(err) => err.is_term_id_mismatch(),
        }
    }
}

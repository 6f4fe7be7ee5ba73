// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use basalt_models::Hash;
use displaydoc::Display;
use thiserror::Error;

use crate::types::TransactionStatus;

/// Transaction pool errors.
#[non_exhaustive]
#[derive(Clone, Display, Error, Debug)]
pub enum PoolError {
    /// transaction rejected: {0}
    Rejected(TransactionStatus),
    /// proposal transaction {0} rejected: {1}
    ProposalRejected(Hash, TransactionStatus),
    /// channel error: {0}
    ChannelError(String),
    /// notification error: {0}
    NotifyError(String),
}

impl PoolError {
    /// The rejection status carried by this error, if any.
    pub fn status(&self) -> Option<TransactionStatus> {
        match self {
            PoolError::Rejected(status) | PoolError::ProposalRejected(_, status) => Some(*status),
            _ => None,
        }
    }
}

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a peer node in the permissioned network.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Builds a peer id from its textual form.
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

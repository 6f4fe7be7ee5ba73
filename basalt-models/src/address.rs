// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::fmt;

use serde::{Deserialize, Serialize};

/// An account or contract address.
///
/// Addresses double as shard keys: all execution messages targeting the same
/// contract address are serialized through one dispatcher.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Builds an address from its textual form.
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into())
    }

    /// The textual form of the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address is empty (no recipient).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(addr: &str) -> Self {
        Address(addr.to_owned())
    }
}

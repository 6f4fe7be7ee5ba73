// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::hash::Hash;

/// An account nonce, opaque to the pool: uniqueness is all that matters.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nonce(Vec<u8>);

impl Nonce {
    /// Wraps raw nonce bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Nonce(bytes.into())
    }

    /// Whether the nonce carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// The immutable payload of a signed transaction.
///
/// Signature checking, fee accounting and wire encoding happen before a
/// transaction reaches the pool; by this point the payload is opaque and
/// only the routing fields below matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Digest of the signed envelope; stable for the transaction's lifetime.
    pub hash: Hash,
    /// Recovered sender address.
    pub sender: Address,
    /// Recipient contract address.
    pub to: Address,
    /// Account nonce.
    pub nonce: Nonce,
    /// Execution attributes (DAG hints, liquidity flags, ...), forwarded
    /// untouched to block assembly.
    pub attribute: u32,
    /// Whether this is a system transaction (scheduled ahead of user traffic).
    pub system_tx: bool,
}

/// The slice of a transaction that block assembly needs: everything else
/// stays in the pool until commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    /// Transaction digest.
    pub hash: Hash,
    /// Recipient contract address.
    pub to: Address,
    /// Execution attributes.
    pub attribute: u32,
}

impl SignedTransaction {
    /// Block-assembly projection of this transaction.
    pub fn metadata(&self) -> TransactionMetadata {
        TransactionMetadata {
            hash: self.hash,
            to: self.to.clone(),
            attribute: self.attribute,
        }
    }
}

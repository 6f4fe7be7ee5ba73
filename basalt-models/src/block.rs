// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use serde::{Deserialize, Serialize};

use crate::hash::Hash;
use crate::timestamp::Timestamp;

/// Header of a block proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height. Proposals not yet bound to a height use -1.
    pub number: i64,
    /// Digest of the header.
    pub hash: Hash,
    /// Proposal timestamp.
    pub timestamp: Timestamp,
}

/// A block proposal as seen by the pool: a header plus the digests of the
/// transactions it seals. Bodies travel separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProposal {
    /// Proposal header.
    pub header: BlockHeader,
    /// Digests of the sealed transactions, in proposal order.
    pub tx_hashes: Vec<Hash>,
}

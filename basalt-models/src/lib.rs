// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

//! Model types shared by the basalt node components.

#![warn(missing_docs)]

mod address;
mod block;
mod error;
mod hash;
mod node;
mod timestamp;
mod transaction;

pub use address::Address;
pub use block::{BlockHeader, BlockProposal};
pub use error::ModelsError;
pub use hash::{BuildKeyHasher, Hash, HashedKey, HashedMap, HashedSet, KeyHasher, HASH_SIZE};
pub use node::PeerId;
pub use timestamp::Timestamp;
pub use transaction::{Nonce, SignedTransaction, TransactionMetadata};

// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use basalt_models::Address;
use serde::{Deserialize, Serialize};

/// Kind of an execution message flowing through the dispatch call graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// A call (or cross-contract call continuation) to execute.
    Message,
    /// The originating call completed successfully.
    Finished,
    /// The originating call reverted.
    Revert,
    /// The context must pause until the named key lock is released.
    KeyLock,
    /// The output travels back to the shard it came from.
    SendBack,
}

/// A message of the dispatch call graph.
///
/// Messages of one transaction share a `context_id`; `seq` numbers the
/// nested calls within the context. Everything else the executor reads from
/// the payload is opaque here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMessage {
    /// Groups all messages of one transaction's call tree.
    pub context_id: u64,
    /// Sequence number within the context.
    pub seq: u32,
    /// Shard the message comes from.
    pub from: Address,
    /// Shard (contract address) the message targets.
    pub to: Address,
    /// Message kind.
    pub message_type: MessageType,
    /// Whether this is a read-only call answered without dispatch batching.
    pub static_call: bool,
    /// Whether the call never leaves the executor process.
    pub internal_call: bool,
    /// Key the context blocks on, for `KeyLock` messages.
    pub key_lock: Option<Vec<u8>>,
    /// Opaque call payload.
    pub data: Vec<u8>,
}

impl ExecutionMessage {
    /// Whether the message terminates its originating call.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.message_type,
            MessageType::Finished | MessageType::Revert
        )
    }
}

/// Outcome of one shard dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Every batched message ran; outputs were routed.
    Finished,
    /// A static call completed; the caller drives further progress.
    Paused,
    /// The executor failed; the enclosing block is abandoned.
    Error,
}

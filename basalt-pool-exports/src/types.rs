// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::fmt;

use basalt_models::{Address, Hash, Nonce};
use serde::{Deserialize, Serialize};

/// Outcome of a transaction submission, as a closed set of status codes.
///
/// Every variant maps 1:1 to a stable numeric code so the status can be
/// reported across process boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum TransactionStatus {
    /// Accepted, no error.
    None = 0,
    /// The pool already holds a transaction with this hash.
    AlreadyInPool = 1,
    /// The pool is at capacity and the submission is limit-checked.
    PoolIsFull = 2,
    /// The nonce was already spent on chain or duplicates a pending one.
    NonceCheckFail = 3,
    /// The transaction's block-limit window has passed.
    BlockLimitCheckFail = 4,
    /// The transaction failed signature or format verification.
    Malformed = 5,
    /// The transaction expired while waiting in the pool.
    PoolTimeout = 6,
}

impl TransactionStatus {
    /// Numeric code for cross-process reporting.
    pub const fn code(&self) -> u32 {
        *self as u32
    }

    /// Whether the status is the success sentinel.
    pub fn is_ok(&self) -> bool {
        matches!(self, TransactionStatus::None)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            TransactionStatus::None => "none",
            TransactionStatus::AlreadyInPool => "transaction already in the pool",
            TransactionStatus::PoolIsFull => "transaction pool is full",
            TransactionStatus::NonceCheckFail => "nonce check failed",
            TransactionStatus::BlockLimitCheckFail => "block limit check failed",
            TransactionStatus::Malformed => "malformed transaction",
            TransactionStatus::PoolTimeout => "transaction expired in the pool",
        };
        write!(f, "{}", desc)
    }
}

/// Result delivered to a submitter once its transaction leaves the pool,
/// by commit or by expiration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSubmitResult {
    /// Digest of the transaction this result is for.
    pub tx_hash: Hash,
    /// Final status.
    pub status: TransactionStatus,
    /// The transaction's nonce, for replay bookkeeping. May be empty when
    /// the committing node never held the transaction body.
    pub nonce: Nonce,
    /// Height of the committing block, -1 when not committed.
    pub batch_id: i64,
    /// Sender address, populated from the pooled transaction on delivery.
    pub sender: Option<Address>,
    /// Recipient address, populated from the pooled transaction on delivery.
    pub to: Option<Address>,
}

impl TransactionSubmitResult {
    /// Builds a result carrying only a hash and a status.
    pub fn new(tx_hash: Hash, status: TransactionStatus) -> Self {
        TransactionSubmitResult {
            tx_hash,
            status,
            nonce: Nonce::default(),
            batch_id: -1,
            sender: None,
            to: None,
        }
    }

    /// Attaches the nonce.
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }

    /// Attaches the committing block height.
    pub fn with_batch_id(mut self, batch_id: i64) -> Self {
        self.batch_id = batch_id;
        self
    }
}

/// Sending half of a submit-result channel, consumed on first notification.
pub type SubmitResultSender = tokio::sync::oneshot::Sender<TransactionSubmitResult>;

/// Receiving half of a submit-result channel: resolves exactly once per
/// accepted submission.
pub type SubmitResultReceiver = tokio::sync::oneshot::Receiver<TransactionSubmitResult>;

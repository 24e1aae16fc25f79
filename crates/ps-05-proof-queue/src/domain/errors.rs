//! Queue and storage errors.

use shared_types::ProofDigest;
use thiserror::Error;

use super::entities::SubmissionState;

/// Errors from the byte-level store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("I/O error: {message}")]
    Io {
        /// Underlying error text
        message: String,
    },

    /// Backing store failed its integrity check on open.
    #[error("Store is corrupted: {0}")]
    Corrupted(String),
}

/// Errors from queue write operations.
///
/// Read operations never return these; they log and return empty results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Backing store is corrupted; no write is accepted.
    #[error("Queue store is corrupted: {0}")]
    CorruptStore(String),

    /// No record with this digest.
    #[error("No proof with digest {0}")]
    NotFound(ProofDigest),

    /// Transition not allowed from the record's current state.
    #[error("Proof {digest} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Record digest
        digest: ProofDigest,
        /// Current state
        from: SubmissionState,
        /// Requested state
        to: SubmissionState,
    },

    /// Store write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Another process owns the queue directory.
    #[error("Queue directory locked: {0}")]
    Locked(String),

    /// Snapshot could not be parsed.
    #[error("Invalid snapshot: {0}")]
    Snapshot(String),
}

impl From<StoreError> for QueueError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Corrupted(reason) => QueueError::CorruptStore(reason),
            StoreError::Io { message } => QueueError::Storage(message),
        }
    }
}

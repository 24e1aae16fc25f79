//! Submission errors.

use ps_04_merkle_aggregation::AggregationError;
use ps_05_proof_queue::{QueueError, SubmissionState};
use shared_types::{DevicePublicKey, LedgerReference, ProofDigest, Timestamp};
use thiserror::Error;

/// Failure reported by the ledger transport.
///
/// Remote failures only; local problems are `SubmissionError` variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Call did not complete (connectivity, timeout, node unavailable).
    #[error("Network error: {0}")]
    Network(String),

    /// Ledger answered and refused the submission.
    #[error("Rejected by ledger: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Network failures are worth retrying; rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

/// Why the ledger refused a submission or query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerRejection {
    /// No account registered for the device.
    #[error("Unknown device {0}")]
    UnknownDevice(DevicePublicKey),

    /// Device account is deactivated.
    #[error("Sensor account is not active")]
    AccountInactive,

    /// Capture time is later than the ledger clock.
    #[error("Invalid timestamp: {timestamp} is after ledger time {now}")]
    InvalidTimestamp {
        /// Claimed capture time
        timestamp: Timestamp,
        /// Ledger clock
        now: Timestamp,
    },

    /// Signature does not verify over the canonical message.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Digest does not match the canonical message.
    #[error("Digest mismatch")]
    DigestMismatch,

    /// Batch count is zero.
    #[error("Invalid proof count")]
    InvalidProofCount,

    /// Batch start is after its end.
    #[error("Invalid timestamp range: {start} > {end}")]
    InvalidTimestampRange {
        /// Range start
        start: Timestamp,
        /// Range end
        end: Timestamp,
    },

    /// Inclusion path does not lead to the stored root.
    #[error("Invalid Merkle proof")]
    InvalidMerkleProof,

    /// Reference was never issued, or is not a batch.
    #[error("Unknown reference {0}")]
    UnknownReference(LedgerReference),
}

impl From<LedgerRejection> for TransportError {
    fn from(e: LedgerRejection) -> Self {
        TransportError::Rejected(e.to_string())
    }
}

/// Errors from the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// Transport failed after the retry budget was spent.
    #[error("Transport failed after {attempts} attempts: {error}")]
    Transport {
        /// Final transport error
        error: TransportError,
        /// Calls made
        attempts: u32,
    },

    /// Batch could not be aggregated.
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    /// Queue rejected a state change.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Proof is already past the submittable states.
    #[error("Proof {digest} is {state}, not submittable")]
    NotSubmittable {
        /// Proof digest
        digest: ProofDigest,
        /// Its current state
        state: SubmissionState,
    },

    /// A batch must carry proofs of exactly one device.
    #[error("Batch mixes proofs from more than one device")]
    MixedDevices,

    /// Batch exceeds what one commitment can count.
    #[error("Batch of {0} proofs is too large")]
    BatchTooLarge(usize),
}

impl SubmissionError {
    /// The transport error, if this is a transport failure.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            SubmissionError::Transport { error, .. } => Some(error),
            _ => None,
        }
    }
}

//! Submission entities.

use std::fmt;

use ps_04_merkle_aggregation::MerkleBatch;
use serde::{Deserialize, Serialize};
use shared_types::{DevicePublicKey, LedgerReference, MerkleRoot, Timestamp};

/// What the transport receives for a batch: the root and its bounds, never
/// the proofs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCommitment {
    /// Merkle root over the batch's leaves.
    pub root: MerkleRoot,
    /// Number of proofs under the root.
    pub count: u32,
    /// Submission time.
    pub timestamp: Timestamp,
    /// Earliest capture time in the batch.
    pub start_captured_at: Timestamp,
    /// Latest capture time in the batch.
    pub end_captured_at: Timestamp,
    /// Device whose proofs the batch carries.
    pub device_id: DevicePublicKey,
}

/// Ledger-side state of a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    /// Accepted, not final.
    Pending,
    /// Final.
    Confirmed,
    /// Dropped or reverted by the ledger.
    Failed(String),
}

/// How a drain call sent its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    Single,
    Batch,
}

impl SubmissionMode {
    /// Lowercase status name.
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionMode::Single => "single",
            SubmissionMode::Batch => "batch",
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful batch submission.
///
/// Carries the tree so the caller can hand out inclusion paths; it is not
/// persisted anywhere.
#[derive(Debug, Clone)]
pub struct BatchReceipt {
    /// Reference the ledger returned.
    pub reference: LedgerReference,
    /// Tree the commitment was built from.
    pub batch: MerkleBatch,
}

impl BatchReceipt {
    /// Committed root.
    pub fn root(&self) -> MerkleRoot {
        self.batch.merkle_root()
    }

    /// Proofs in the batch.
    pub fn count(&self) -> usize {
        self.batch.len()
    }
}

/// Result of `drain_pending`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records taken from the queue.
    pub processed: usize,
    /// Records now `Submitted`.
    pub submitted: usize,
    /// Records whose submission failed.
    pub failed: usize,
    /// Mode used, when anything was sent.
    pub mode: Option<SubmissionMode>,
    /// Ledger reference on success.
    pub reference: Option<LedgerReference>,
    /// Final transport error text on failure.
    pub last_error: Option<String>,
}

/// Result of `refresh_statuses`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// References polled.
    pub polled: usize,
    /// Records moved to `Confirmed`.
    pub confirmed: usize,
    /// Records moved to `Failed`.
    pub failed: usize,
    /// Records still awaiting confirmation.
    pub still_pending: usize,
    /// References whose status could not be fetched.
    pub errors: usize,
}

/// Per-device ledger account statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Proofs recorded, single or batched.
    pub proof_count: u64,
    /// Proofs whose signature or commitment the ledger accepted.
    pub total_proofs_verified: u64,
    /// Latest capture time recorded for the device.
    pub last_proof_timestamp: Timestamp,
    /// Whether the device may submit.
    pub is_active: bool,
}

//! # Queue Entities
//!
//! ## State Machine
//!
//! ```text
//! Pending ──submit ok──→ Submitted ──ledger confirms──→ Confirmed
//!    │                      │
//!    └──submit fails──→ Failed ←──ledger reports error──┘
//!                         │ ↑
//!                         └─┘ retried directly, or requeued to Pending
//! ```
//!
//! `Confirmed` is terminal.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{LedgerReference, MerkleRoot, ProofDigest, SensorKind, SignedProof, Timestamp};

use super::errors::QueueError;

/// Submission lifecycle state of a stored proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    /// Stored, not yet sent.
    Pending,
    /// Accepted by the transport, awaiting confirmation.
    Submitted,
    /// Confirmed by the ledger. Terminal.
    Confirmed,
    /// Last attempt failed. Retryable.
    Failed,
}

impl SubmissionState {
    /// All states, in declaration order.
    pub const ALL: [SubmissionState; 4] = [
        SubmissionState::Pending,
        SubmissionState::Submitted,
        SubmissionState::Confirmed,
        SubmissionState::Failed,
    ];

    /// Merge precedence: `Confirmed > Submitted > Failed > Pending`.
    pub fn rank(self) -> u8 {
        match self {
            SubmissionState::Pending => 0,
            SubmissionState::Failed => 1,
            SubmissionState::Submitted => 2,
            SubmissionState::Confirmed => 3,
        }
    }

    /// Whether the state machine allows `self -> to`.
    pub fn can_transition_to(self, to: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, to),
            (Pending, Submitted)
                | (Pending, Failed)
                | (Failed, Submitted)
                | (Failed, Failed)
                | (Failed, Pending)
                | (Submitted, Confirmed)
                | (Submitted, Failed)
        )
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        self == SubmissionState::Confirmed
    }

    /// Whether the orchestrator may send this record.
    pub fn is_submittable(self) -> bool {
        matches!(self, SubmissionState::Pending | SubmissionState::Failed)
    }

    /// Lowercase state name.
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionState::Pending => "pending",
            SubmissionState::Submitted => "submitted",
            SubmissionState::Confirmed => "confirmed",
            SubmissionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signed proof plus its local submission metadata.
///
/// Fields change only through the queue's transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProof {
    proof: SignedProof,
    state: SubmissionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    submitted_at_ms: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ledger_reference: Option<LedgerReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
    #[serde(default)]
    attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_root: Option<MerkleRoot>,
}

impl StoredProof {
    /// Fresh `Pending` record.
    pub fn new(proof: SignedProof) -> Self {
        Self {
            proof,
            state: SubmissionState::Pending,
            submitted_at_ms: None,
            ledger_reference: None,
            last_error: None,
            attempts: 0,
            batch_root: None,
        }
    }

    /// The stored proof.
    pub fn proof(&self) -> &SignedProof {
        &self.proof
    }

    /// Take the proof out of the record.
    pub fn into_proof(self) -> SignedProof {
        self.proof
    }

    /// Primary key of the record.
    pub fn digest(&self) -> &ProofDigest {
        self.proof.digest()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// When the last successful send happened.
    pub fn submitted_at_ms(&self) -> Option<Timestamp> {
        self.submitted_at_ms
    }

    /// Reference from the last successful send.
    pub fn ledger_reference(&self) -> Option<&LedgerReference> {
        self.ledger_reference.as_ref()
    }

    /// Reason recorded by the last failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Transport calls made on this record's behalf.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Root of the batch that carried this proof, if it went in a batch.
    pub fn batch_root(&self) -> Option<&MerkleRoot> {
        self.batch_root.as_ref()
    }

    /// Sensor kind of the stored reading.
    pub fn kind(&self) -> SensorKind {
        self.proof.kind()
    }

    /// Capture time of the stored reading.
    pub fn captured_at_ms(&self) -> Timestamp {
        self.proof.captured_at_ms()
    }

    fn check(&self, to: SubmissionState) -> Result<(), QueueError> {
        if self.state.can_transition_to(to) {
            Ok(())
        } else {
            Err(QueueError::InvalidTransition {
                digest: *self.digest(),
                from: self.state,
                to,
            })
        }
    }

    pub(crate) fn check_submit(&self) -> Result<(), QueueError> {
        self.check(SubmissionState::Submitted)
    }

    pub(crate) fn submit(
        &mut self,
        reference: LedgerReference,
        batch_root: Option<MerkleRoot>,
        now: Timestamp,
    ) -> Result<(), QueueError> {
        self.check_submit()?;
        self.state = SubmissionState::Submitted;
        self.submitted_at_ms = Some(now);
        self.ledger_reference = Some(reference);
        self.batch_root = batch_root;
        self.last_error = None;
        self.attempts = self.attempts.saturating_add(1);
        Ok(())
    }

    /// A failed send counts as an attempt; a ledger-side rejection of an
    /// already submitted proof does not.
    pub(crate) fn fail(&mut self, reason: String) -> Result<(), QueueError> {
        self.check(SubmissionState::Failed)?;
        if self.state != SubmissionState::Submitted {
            self.attempts = self.attempts.saturating_add(1);
        }
        self.state = SubmissionState::Failed;
        self.last_error = Some(reason);
        Ok(())
    }

    pub(crate) fn confirm(&mut self) -> Result<(), QueueError> {
        self.check(SubmissionState::Confirmed)?;
        self.state = SubmissionState::Confirmed;
        self.last_error = None;
        Ok(())
    }

    pub(crate) fn requeue(&mut self) -> Result<(), QueueError> {
        self.check(SubmissionState::Pending)?;
        self.state = SubmissionState::Pending;
        Ok(())
    }

    /// Oldest-first ordering key, digest as tie-break.
    pub(crate) fn order_key(&self) -> (Timestamp, ProofDigest) {
        (self.captured_at_ms(), *self.digest())
    }
}

/// Result of `append`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// New `Pending` record created.
    Inserted,
    /// Digest already stored; the existing record is untouched.
    Duplicate(SubmissionState),
}

/// Per-state record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Records waiting for a first send.
    pub pending: usize,
    /// Records sent and awaiting the ledger.
    pub submitted: usize,
    /// Records finalized on the ledger.
    pub confirmed: usize,
    /// Records whose last send or ledger status failed.
    pub failed: usize,
    /// Oldest capture time among `Pending` and `Failed` records.
    pub oldest_unsubmitted_ms: Option<Timestamp>,
}

impl QueueStats {
    /// All records.
    pub fn total(&self) -> usize {
        self.pending + self.submitted + self.confirmed + self.failed
    }

    pub(crate) fn count(&mut self, record: &StoredProof) {
        match record.state() {
            SubmissionState::Pending => self.pending += 1,
            SubmissionState::Submitted => self.submitted += 1,
            SubmissionState::Confirmed => self.confirmed += 1,
            SubmissionState::Failed => self.failed += 1,
        }
        if record.state().is_submittable() {
            let ts = record.captured_at_ms();
            self.oldest_unsubmitted_ms = Some(self.oldest_unsubmitted_ms.map_or(ts, |o| o.min(ts)));
        }
    }
}

/// Result of `import_merging`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Digests not previously stored.
    pub inserted: usize,
    /// Existing records replaced by a more advanced snapshot record.
    pub updated: usize,
    /// Snapshot records that lost the merge.
    pub unchanged: usize,
    /// Snapshot records whose digest does not match their reading.
    pub rejected: usize,
}

/// Result of `compact`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// Raw entries examined.
    pub scanned: usize,
    /// Records rewritten under their canonical key and encoding.
    pub rewritten: usize,
    /// Duplicate entries folded into another record of the same digest.
    pub merged: usize,
    /// Entries that could not be decoded, moved under the quarantine prefix.
    pub quarantined: usize,
    /// Records whose stored digest does not match their reading.
    pub digest_mismatches: usize,
}

impl CompactionReport {
    /// Whether compaction changed anything on disk.
    pub fn changed(&self) -> bool {
        self.rewritten + self.merged + self.quarantined > 0
    }
}

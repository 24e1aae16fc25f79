//! # Outbound Ports (Driven Ports / SPI)
//!
//! The external ledger. Treated as a remote call with its own failure
//! modes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{LedgerReference, ProofDigest, SignedProof};

use crate::domain::{BatchCommitment, LedgerStatus, TransportError};

/// Ledger transport.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Record a batch root.
    async fn submit_commitment(&self, commitment: &BatchCommitment) -> Result<LedgerReference, TransportError>;

    /// Record and verify one proof.
    async fn submit_single(&self, proof: &SignedProof) -> Result<LedgerReference, TransportError>;

    /// Current status of an earlier submission.
    async fn get_status(&self, reference: &LedgerReference) -> Result<LedgerStatus, TransportError>;
}

/// Scriptable transport for tests.
///
/// References are `tx_1`, `tx_2`, ... in call order.
#[derive(Default)]
pub struct MockLedgerTransport {
    next_tx: AtomicU64,
    /// Number of upcoming submit calls that fail with a network error.
    pub network_failures: AtomicU32,
    /// Reject every submit call.
    pub reject: AtomicBool,
    submit_calls: AtomicU32,
    commitments: Mutex<Vec<BatchCommitment>>,
    singles: Mutex<Vec<ProofDigest>>,
    statuses: Mutex<HashMap<LedgerReference, LedgerStatus>>,
}

impl MockLedgerTransport {
    /// Transport that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` submit calls with `TransportError::Network`.
    pub fn fail_next(&self, n: u32) {
        self.network_failures.store(n, Ordering::SeqCst);
    }

    /// Override what `get_status` reports for `reference`.
    pub fn set_status(&self, reference: &LedgerReference, status: LedgerStatus) {
        self.statuses.lock().insert(reference.clone(), status);
    }

    /// Submit calls so far, including failed ones.
    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Commitments accepted so far.
    pub fn commitments(&self) -> Vec<BatchCommitment> {
        self.commitments.lock().clone()
    }

    /// Digests of single proofs accepted so far.
    pub fn singles(&self) -> Vec<ProofDigest> {
        self.singles.lock().clone()
    }

    fn admit(&self) -> Result<LedgerReference, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .network_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Network("connection reset".into()));
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("mock rejection".into()));
        }
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        let reference = LedgerReference::new(format!("tx_{}", n));
        self.statuses.lock().insert(reference.clone(), LedgerStatus::Pending);
        Ok(reference)
    }
}

#[async_trait]
impl LedgerTransport for MockLedgerTransport {
    async fn submit_commitment(&self, commitment: &BatchCommitment) -> Result<LedgerReference, TransportError> {
        let reference = self.admit()?;
        self.commitments.lock().push(commitment.clone());
        Ok(reference)
    }

    async fn submit_single(&self, proof: &SignedProof) -> Result<LedgerReference, TransportError> {
        let reference = self.admit()?;
        self.singles.lock().push(*proof.digest());
        Ok(reference)
    }

    async fn get_status(&self, reference: &LedgerReference) -> Result<LedgerStatus, TransportError> {
        self.statuses
            .lock()
            .get(reference)
            .cloned()
            .ok_or_else(|| TransportError::Rejected(format!("unknown reference {}", reference)))
    }
}

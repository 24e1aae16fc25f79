//! # In-Memory Ledger
//!
//! A `LedgerTransport` that checks submissions the way the on-ledger
//! verification program does, without any network.
//!
//! ## Rules
//!
//! | Call | Checks |
//! |------|--------|
//! | `submit_single` | device registered and active, capture time not after ledger time, digest and Ed25519 signature over the canonical message |
//! | `submit_commitment` | device registered and active, `count > 0`, `start <= end` |
//! | `verify_inclusion` | path recomputes the stored batch root by index parity |
//!
//! Accepted submissions are `Pending` until `finalize_pending` (or at once
//! with `auto_confirm`).

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use ps_01_canonical_encoding::{digest_of, CanonicalEncoder};
use ps_04_merkle_aggregation::verify_inclusion;
use shared_crypto::{verify_ed25519, Hash};
use shared_types::{
    DevicePublicKey, LedgerReference, MerkleRoot, ProofDigest, SignedProof, SystemTimeSource,
    TimeSource,
};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::domain::{BatchCommitment, DeviceStats, LedgerRejection, LedgerStatus, TransportError};
use crate::ports::outbound::LedgerTransport;

/// What a reference points at.
#[derive(Debug, Clone)]
enum Recorded {
    Single { digest: ProofDigest },
    Batch { root: MerkleRoot, count: u32 },
}

#[derive(Debug, Clone)]
struct Entry {
    recorded: Recorded,
    status: LedgerStatus,
}

#[derive(Debug, Default)]
struct LedgerState {
    next_tx: u64,
    accounts: HashMap<DevicePublicKey, DeviceStats>,
    entries: HashMap<LedgerReference, Entry>,
}

impl LedgerState {
    fn active_account(&mut self, device: &DevicePublicKey) -> Result<&mut DeviceStats, LedgerRejection> {
        let account = self
            .accounts
            .get_mut(device)
            .ok_or(LedgerRejection::UnknownDevice(*device))?;
        if !account.is_active {
            return Err(LedgerRejection::AccountInactive);
        }
        Ok(account)
    }

    fn record(&mut self, recorded: Recorded, auto_confirm: bool) -> LedgerReference {
        self.next_tx += 1;
        let reference = LedgerReference::new(format!("tx_{}", self.next_tx));
        let status = if auto_confirm {
            LedgerStatus::Confirmed
        } else {
            LedgerStatus::Pending
        };
        self.entries.insert(reference.clone(), Entry { recorded, status });
        reference
    }
}

/// Ledger held in process memory.
pub struct InMemoryLedger<T: TimeSource = SystemTimeSource> {
    time: T,
    encoder: CanonicalEncoder,
    config: LedgerConfig,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger<SystemTimeSource> {
    /// Ledger on the system clock.
    pub fn new(config: LedgerConfig) -> Self {
        Self::with_time_source(SystemTimeSource, config)
    }
}

impl<T: TimeSource> InMemoryLedger<T> {
    /// Ledger on an explicit clock.
    pub fn with_time_source(time: T, config: LedgerConfig) -> Self {
        Self {
            time,
            encoder: CanonicalEncoder::new(config.format),
            config,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Open an active account for `device`. Existing accounts are kept.
    pub fn register_device(&self, device: DevicePublicKey) {
        let mut state = self.state.lock();
        state.accounts.entry(device).or_insert_with(|| {
            info!("[ps-06] Ledger account opened for {}", device);
            DeviceStats {
                proof_count: 0,
                total_proofs_verified: 0,
                last_proof_timestamp: 0,
                is_active: true,
            }
        });
    }

    /// Allow submissions from `device` again.
    pub fn activate(&self, device: &DevicePublicKey) -> Result<(), LedgerRejection> {
        self.set_active(device, true)
    }

    /// Refuse further submissions from `device`.
    pub fn deactivate(&self, device: &DevicePublicKey) -> Result<(), LedgerRejection> {
        self.set_active(device, false)
    }

    fn set_active(&self, device: &DevicePublicKey, active: bool) -> Result<(), LedgerRejection> {
        let mut state = self.state.lock();
        let account = state
            .accounts
            .get_mut(device)
            .ok_or(LedgerRejection::UnknownDevice(*device))?;
        account.is_active = active;
        info!("[ps-06] Ledger account {} active={}", device, active);
        Ok(())
    }

    /// Account counters for `device`.
    pub fn device_stats(&self, device: &DevicePublicKey) -> Option<DeviceStats> {
        self.state.lock().accounts.get(device).copied()
    }

    /// Confirm every pending submission. Returns how many changed.
    pub fn finalize_pending(&self) -> usize {
        let mut state = self.state.lock();
        let mut confirmed = 0;
        for entry in state.entries.values_mut() {
            if entry.status == LedgerStatus::Pending {
                entry.status = LedgerStatus::Confirmed;
                confirmed += 1;
            }
        }
        debug!("[ps-06] Ledger finalized {} submissions", confirmed);
        confirmed
    }

    /// Mark a submission as dropped by the ledger.
    pub fn fail(&self, reference: &LedgerReference, reason: impl Into<String>) -> Result<(), LedgerRejection> {
        let mut state = self.state.lock();
        let entry = state
            .entries
            .get_mut(reference)
            .ok_or_else(|| LedgerRejection::UnknownReference(reference.clone()))?;
        entry.status = LedgerStatus::Failed(reason.into());
        Ok(())
    }

    /// Root committed under `reference`, if it is a batch.
    pub fn commitment_root(&self, reference: &LedgerReference) -> Option<MerkleRoot> {
        match self.state.lock().entries.get(reference)?.recorded {
            Recorded::Batch { root, .. } => Some(root),
            Recorded::Single { .. } => None,
        }
    }

    /// Proof count committed under `reference`, if it is a batch.
    pub fn commitment_count(&self, reference: &LedgerReference) -> Option<u32> {
        match self.state.lock().entries.get(reference)?.recorded {
            Recorded::Batch { count, .. } => Some(count),
            Recorded::Single { .. } => None,
        }
    }

    /// Digest recorded under `reference`, if it is a single proof.
    pub fn recorded_digest(&self, reference: &LedgerReference) -> Option<ProofDigest> {
        match self.state.lock().entries.get(reference)?.recorded {
            Recorded::Single { digest } => Some(digest),
            Recorded::Batch { .. } => None,
        }
    }

    /// Check that `leaf` at `index` belongs to the batch under `reference`.
    pub fn verify_inclusion(
        &self,
        reference: &LedgerReference,
        leaf: &Hash,
        path: &[Hash],
        index: usize,
    ) -> Result<(), LedgerRejection> {
        let root = self
            .commitment_root(reference)
            .ok_or_else(|| LedgerRejection::UnknownReference(reference.clone()))?;
        if verify_inclusion(leaf, path, index, root.as_bytes()) {
            Ok(())
        } else {
            Err(LedgerRejection::InvalidMerkleProof)
        }
    }

    /// Number of recorded submissions.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_single(&self, proof: &SignedProof) -> Result<(), LedgerRejection> {
        let now = self.time.now();
        let timestamp = proof.captured_at_ms();
        if timestamp > now {
            return Err(LedgerRejection::InvalidTimestamp { timestamp, now });
        }

        let message = self
            .encoder
            .encode(proof.reading())
            .map_err(|_| LedgerRejection::InvalidSignature)?;
        if digest_of(&message) != *proof.digest() {
            return Err(LedgerRejection::DigestMismatch);
        }
        if !verify_ed25519(
            &message,
            proof.signature().as_bytes(),
            proof.signer_key().as_bytes(),
        ) {
            return Err(LedgerRejection::InvalidSignature);
        }
        Ok(())
    }

    fn accept_single(&self, proof: &SignedProof) -> Result<LedgerReference, LedgerRejection> {
        let mut state = self.state.lock();
        state.active_account(proof.signer_key())?;
        self.check_single(proof)?;

        let account = state.active_account(proof.signer_key())?;
        account.proof_count += 1;
        account.total_proofs_verified += 1;
        account.last_proof_timestamp = account.last_proof_timestamp.max(proof.captured_at_ms());

        Ok(state.record(
            Recorded::Single {
                digest: *proof.digest(),
            },
            self.config.auto_confirm,
        ))
    }

    fn accept_commitment(&self, commitment: &BatchCommitment) -> Result<LedgerReference, LedgerRejection> {
        let mut state = self.state.lock();
        let account = state.active_account(&commitment.device_id)?;
        if commitment.count == 0 {
            return Err(LedgerRejection::InvalidProofCount);
        }
        if commitment.start_captured_at > commitment.end_captured_at {
            return Err(LedgerRejection::InvalidTimestampRange {
                start: commitment.start_captured_at,
                end: commitment.end_captured_at,
            });
        }

        account.proof_count += u64::from(commitment.count);
        account.total_proofs_verified += u64::from(commitment.count);
        account.last_proof_timestamp = account.last_proof_timestamp.max(commitment.end_captured_at);

        Ok(state.record(
            Recorded::Batch {
                root: commitment.root,
                count: commitment.count,
            },
            self.config.auto_confirm,
        ))
    }
}

#[async_trait]
impl<T: TimeSource> LedgerTransport for InMemoryLedger<T> {
    async fn submit_commitment(&self, commitment: &BatchCommitment) -> Result<LedgerReference, TransportError> {
        match self.accept_commitment(commitment) {
            Ok(reference) => {
                info!(
                    "[ps-06] Ledger recorded batch root {} ({} proofs) as {}",
                    commitment.root, commitment.count, reference
                );
                Ok(reference)
            }
            Err(e) => {
                warn!("[ps-06] Ledger rejected batch root {}: {}", commitment.root, e);
                Err(e.into())
            }
        }
    }

    async fn submit_single(&self, proof: &SignedProof) -> Result<LedgerReference, TransportError> {
        match self.accept_single(proof) {
            Ok(reference) => {
                debug!("[ps-06] Ledger verified {} as {}", proof.digest(), reference);
                Ok(reference)
            }
            Err(e) => {
                warn!("[ps-06] Ledger rejected {}: {}", proof.digest(), e);
                Err(e.into())
            }
        }
    }

    async fn get_status(&self, reference: &LedgerReference) -> Result<LedgerStatus, TransportError> {
        self.state
            .lock()
            .entries
            .get(reference)
            .map(|e| e.status.clone())
            .ok_or_else(|| LedgerRejection::UnknownReference(reference.clone()).into())
    }
}

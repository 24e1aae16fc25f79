//! # Proof Queue Service
//!
//! Implements `ProofQueueApi` over any `KeyValueStore`.
//!
//! Records are cached in memory and written through to the store. One
//! `RwLock` guards both: every write holds it exclusively for the whole
//! read-modify-write, so transitions on a digest are linearized.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use ps_01_canonical_encoding::CanonicalEncoder;
use shared_types::{
    LedgerReference, MerkleRoot, ProofDigest, SensorKind, SignedProof, SystemTimeSource,
    TimeSource, Timestamp,
};
use tracing::{debug, info, warn};

use crate::adapters::{DirectoryLock, FileBackedKVStore};
use crate::config::QueueConfig;
use crate::domain::{
    prefer_incoming, AppendOutcome, CompactionReport, ImportReport, QueueError, QueueSnapshot,
    QueueStats, StoredProof, SubmissionState,
};
use crate::ports::inbound::ProofQueueApi;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// Key prefix for stored proof records.
pub const RECORD_PREFIX: &[u8] = b"proof:";

/// Key prefix undecodable entries are moved under by `compact`.
pub const QUARANTINE_PREFIX: &[u8] = b"quarantine:";

/// Canonical store key for a digest: prefix plus lowercase hex.
pub fn record_key(digest: &ProofDigest) -> Vec<u8> {
    let mut key = RECORD_PREFIX.to_vec();
    key.extend_from_slice(digest.to_hex().as_bytes());
    key
}

fn encode_record(record: &StoredProof) -> Result<Vec<u8>, QueueError> {
    serde_json::to_vec(record).map_err(|e| QueueError::Storage(e.to_string()))
}

fn decode_record(bytes: &[u8]) -> Result<StoredProof, serde_json::Error> {
    serde_json::from_slice(bytes)
}

struct QueueInner<S> {
    store: S,
    records: HashMap<ProofDigest, StoredProof>,
}

fn load_records<S: KeyValueStore>(store: &S) -> HashMap<ProofDigest, StoredProof> {
    let entries = match store.prefix_scan(RECORD_PREFIX) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("[ps-05] Could not scan store, starting empty: {}", e);
            return HashMap::new();
        }
    };

    let mut records: HashMap<ProofDigest, StoredProof> = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        match decode_record(&value) {
            Ok(record) => match records.get(record.digest()) {
                Some(existing) if !prefer_incoming(existing, &record) => {}
                _ => {
                    records.insert(*record.digest(), record);
                }
            },
            Err(e) => warn!(
                "[ps-05] Skipping undecodable record {}: {}",
                String::from_utf8_lossy(&key),
                e
            ),
        }
    }
    records
}

impl<S: KeyValueStore> QueueInner<S> {
    /// Write `puts` and `deletes` in one atomic batch, then update the cache.
    fn commit(&mut self, puts: Vec<StoredProof>, deletes: Vec<ProofDigest>) -> Result<(), QueueError> {
        if puts.is_empty() && deletes.is_empty() {
            return Ok(());
        }

        let mut ops = Vec::with_capacity(puts.len() + deletes.len());
        for digest in &deletes {
            ops.push(BatchOperation::delete(record_key(digest)));
        }
        for record in &puts {
            ops.push(BatchOperation::put(record_key(record.digest()), encode_record(record)?));
        }
        self.store.atomic_batch_write(ops)?;

        for digest in deletes {
            self.records.remove(&digest);
        }
        for record in puts {
            self.records.insert(*record.digest(), record);
        }
        Ok(())
    }

    fn select(&self, filter: impl Fn(&StoredProof) -> bool) -> Vec<StoredProof> {
        let mut out: Vec<StoredProof> = self.records.values().filter(|r| filter(r)).cloned().collect();
        out.sort_by_key(|r| r.order_key());
        out
    }
}

/// Durable proof queue.
pub struct ProofQueue<S: KeyValueStore, T: TimeSource = SystemTimeSource> {
    inner: RwLock<QueueInner<S>>,
    time: T,
    encoder: CanonicalEncoder,
    config: QueueConfig,
    _lock: Option<DirectoryLock>,
}

impl<S: KeyValueStore> ProofQueue<S, SystemTimeSource> {
    /// Queue over `store` using the system clock.
    pub fn new(store: S, config: QueueConfig) -> Self {
        Self::with_time_source(store, SystemTimeSource, config)
    }
}

impl ProofQueue<FileBackedKVStore, SystemTimeSource> {
    /// Lock `dir` and open the file-backed queue inside it.
    ///
    /// # Errors
    /// * `QueueError::Locked` - another process owns the directory
    pub fn open_dir(dir: &Path, config: QueueConfig) -> Result<Self, QueueError> {
        let lock = DirectoryLock::acquire(dir).map_err(|e| QueueError::Locked(e.to_string()))?;
        let store = FileBackedKVStore::open(dir.join(&config.store_file));
        let mut queue = Self::new(store, config);
        queue._lock = Some(lock);
        Ok(queue)
    }
}

impl<S: KeyValueStore, T: TimeSource> ProofQueue<S, T> {
    /// Queue over `store` using an explicit clock.
    pub fn with_time_source(store: S, time: T, config: QueueConfig) -> Self {
        let inner = QueueInner {
            records: load_records(&store),
            store,
        };
        info!("[ps-05] Proof queue opened with {} records", inner.records.len());
        Self {
            inner: RwLock::new(inner),
            time,
            encoder: CanonicalEncoder::new(config.format),
            config,
            _lock: None,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Run `f` against the raw store, then reload the cache from it.
    ///
    /// For maintenance such as quarantining a corrupted file.
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut inner = self.inner.write();
        let result = f(&mut inner.store);
        inner.records = load_records(&inner.store);
        result
    }

    fn digest_matches(&self, proof: &SignedProof) -> bool {
        matches!(self.encoder.digest(proof.reading()), Ok(d) if d == *proof.digest())
    }

    fn transition(
        &self,
        digest: &ProofDigest,
        apply: impl FnOnce(&mut StoredProof) -> Result<(), QueueError>,
    ) -> Result<StoredProof, QueueError> {
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;
        let mut record = inner
            .records
            .get(digest)
            .cloned()
            .ok_or(QueueError::NotFound(*digest))?;
        let from = record.state();
        apply(&mut record)?;
        inner.commit(vec![record.clone()], Vec::new())?;
        debug!("[ps-05] {} {} -> {}", digest, from, record.state());
        Ok(record)
    }
}

impl<S: KeyValueStore, T: TimeSource> ProofQueueApi for ProofQueue<S, T> {
    fn append(&self, proof: SignedProof) -> Result<AppendOutcome, QueueError> {
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;
        if let Some(existing) = inner.records.get(proof.digest()) {
            debug!("[ps-05] Duplicate append of {} ({})", proof.digest(), existing.state());
            return Ok(AppendOutcome::Duplicate(existing.state()));
        }
        let digest = *proof.digest();
        inner.commit(vec![StoredProof::new(proof)], Vec::new())?;
        debug!("[ps-05] Queued {}", digest);
        Ok(AppendOutcome::Inserted)
    }

    fn append_many(&self, proofs: Vec<SignedProof>) -> Result<Vec<AppendOutcome>, QueueError> {
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;

        let mut outcomes = Vec::with_capacity(proofs.len());
        let mut fresh: HashMap<ProofDigest, StoredProof> = HashMap::new();
        for proof in proofs {
            if let Some(existing) = inner.records.get(proof.digest()) {
                outcomes.push(AppendOutcome::Duplicate(existing.state()));
            } else if fresh.contains_key(proof.digest()) {
                outcomes.push(AppendOutcome::Duplicate(SubmissionState::Pending));
            } else {
                fresh.insert(*proof.digest(), StoredProof::new(proof));
                outcomes.push(AppendOutcome::Inserted);
            }
        }

        let inserted = fresh.len();
        inner.commit(fresh.into_values().collect(), Vec::new())?;
        debug!("[ps-05] Queued {} of {} proofs", inserted, outcomes.len());
        Ok(outcomes)
    }

    fn get(&self, digest: &ProofDigest) -> Option<StoredProof> {
        self.inner.read().records.get(digest).cloned()
    }

    fn list_pending(&self, limit: usize) -> Vec<StoredProof> {
        let mut out = self.list_by_state(SubmissionState::Pending);
        out.truncate(limit);
        out
    }

    fn list_submittable(&self, limit: usize) -> Vec<StoredProof> {
        let inner = self.inner.read();
        let mut out = inner.select(|r| r.state() == SubmissionState::Pending);
        if out.len() < limit {
            out.extend(inner.select(|r| r.state() == SubmissionState::Failed));
        }
        out.truncate(limit);
        out
    }

    fn list_by_state(&self, state: SubmissionState) -> Vec<StoredProof> {
        self.inner.read().select(|r| r.state() == state)
    }

    fn mark_submitted(&self, digest: &ProofDigest, reference: LedgerReference) -> Result<StoredProof, QueueError> {
        let now = self.time.now();
        self.transition(digest, |r| r.submit(reference, None, now))
    }

    fn mark_batch_submitted(
        &self,
        digests: &[ProofDigest],
        reference: LedgerReference,
        root: MerkleRoot,
    ) -> Result<(), QueueError> {
        let now = self.time.now();
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;

        // Validate every record before writing any
        let mut updated = Vec::with_capacity(digests.len());
        for digest in digests {
            let mut record = inner
                .records
                .get(digest)
                .cloned()
                .ok_or(QueueError::NotFound(*digest))?;
            record.submit(reference.clone(), Some(root), now)?;
            updated.push(record);
        }

        inner.commit(updated, Vec::new())?;
        debug!(
            "[ps-05] {} proofs submitted under {} (root {})",
            digests.len(),
            reference,
            root
        );
        Ok(())
    }

    fn mark_failed(&self, digest: &ProofDigest, reason: &str) -> Result<StoredProof, QueueError> {
        self.transition(digest, |r| r.fail(reason.to_string()))
    }

    fn mark_confirmed(&self, digest: &ProofDigest) -> Result<StoredProof, QueueError> {
        if let Some(record) = self.get(digest) {
            if record.state() == SubmissionState::Confirmed {
                return Ok(record);
            }
        }
        self.transition(digest, StoredProof::confirm)
    }

    fn requeue_failed(&self) -> Result<usize, QueueError> {
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;

        let mut requeued = inner.select(|r| r.state() == SubmissionState::Failed);
        for record in &mut requeued {
            record.requeue()?;
        }
        let count = requeued.len();
        inner.commit(requeued, Vec::new())?;
        if count > 0 {
            info!("[ps-05] Requeued {} failed proofs", count);
        }
        Ok(count)
    }

    fn query_by_kind(&self, kind: SensorKind) -> Vec<StoredProof> {
        self.inner.read().select(|r| r.kind() == kind)
    }

    fn query_by_time_range(&self, start: Timestamp, end: Timestamp) -> Vec<StoredProof> {
        if start > end {
            return Vec::new();
        }
        self.inner
            .read()
            .select(|r| (start..=end).contains(&r.captured_at_ms()))
    }

    fn purge_older_than(&self, age_ms: u64) -> Result<usize, QueueError> {
        let cutoff = self.time.now().saturating_sub(age_ms);
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;

        let doomed: Vec<ProofDigest> = inner
            .records
            .values()
            .filter(|r| r.captured_at_ms() < cutoff)
            .map(|r| *r.digest())
            .collect();
        let count = doomed.len();
        inner.commit(Vec::new(), doomed)?;
        info!("[ps-05] Purged {} proofs captured before {}", count, cutoff);
        Ok(count)
    }

    fn export_all(&self) -> Vec<u8> {
        let records = self.inner.read().select(|_| true);
        let count = records.len();
        match QueueSnapshot::new(records, self.time.now()).to_bytes() {
            Ok(bytes) => {
                info!("[ps-05] Exported {} proofs", count);
                bytes
            }
            Err(e) => {
                warn!("[ps-05] Export failed: {}", e);
                Vec::new()
            }
        }
    }

    fn import_merging(&self, snapshot: &[u8]) -> Result<ImportReport, QueueError> {
        let snapshot = QueueSnapshot::from_bytes(snapshot)?;
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;

        let mut report = ImportReport::default();
        let mut staged: HashMap<ProofDigest, StoredProof> = HashMap::new();
        for incoming in snapshot.records {
            if self.config.verify_digests && !self.digest_matches(incoming.proof()) {
                warn!("[ps-05] Rejecting imported proof {}: digest mismatch", incoming.digest());
                report.rejected += 1;
                continue;
            }
            let digest = *incoming.digest();
            match staged.get(&digest).or_else(|| inner.records.get(&digest)) {
                None => {
                    report.inserted += 1;
                    staged.insert(digest, incoming);
                }
                Some(existing) if prefer_incoming(existing, &incoming) => {
                    report.updated += 1;
                    staged.insert(digest, incoming);
                }
                Some(_) => report.unchanged += 1,
            }
        }

        inner.commit(staged.into_values().collect(), Vec::new())?;
        info!(
            "[ps-05] Import: {} inserted, {} updated, {} unchanged, {} rejected",
            report.inserted, report.updated, report.unchanged, report.rejected
        );
        Ok(report)
    }

    fn compact(&self) -> Result<CompactionReport, QueueError> {
        let mut inner = self.inner.write();
        inner.store.check_integrity()?;
        let raw = inner.store.prefix_scan(RECORD_PREFIX)?;

        let mut report = CompactionReport {
            scanned: raw.len(),
            ..CompactionReport::default()
        };
        let mut ops = Vec::new();
        let mut winners: HashMap<ProofDigest, StoredProof> = HashMap::new();
        let mut sources: HashMap<ProofDigest, Vec<(Vec<u8>, Vec<u8>)>> = HashMap::new();

        for (key, value) in raw {
            match decode_record(&value) {
                Ok(record) => {
                    let digest = *record.digest();
                    sources.entry(digest).or_default().push((key, value));
                    match winners.get(&digest) {
                        Some(existing) if !prefer_incoming(existing, &record) => {}
                        _ => {
                            winners.insert(digest, record);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "[ps-05] Quarantining undecodable record {}: {}",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    let mut aside = QUARANTINE_PREFIX.to_vec();
                    aside.extend_from_slice(&key);
                    ops.push(BatchOperation::put(aside, value));
                    ops.push(BatchOperation::delete(key));
                    report.quarantined += 1;
                }
            }
        }

        for (digest, record) in &winners {
            if self.config.verify_digests && !self.digest_matches(record.proof()) {
                warn!("[ps-05] Stored proof {} does not match its reading", digest);
                report.digest_mismatches += 1;
            }

            let canonical_key = record_key(digest);
            let canonical_value = encode_record(record)?;
            let entries = sources.get(digest).map(Vec::as_slice).unwrap_or_default();
            report.merged += entries.len().saturating_sub(1);

            let clean = matches!(entries, [(key, value)] if *key == canonical_key && *value == canonical_value);
            if clean {
                continue;
            }
            report.rewritten += 1;
            for (key, _) in entries {
                if *key != canonical_key {
                    ops.push(BatchOperation::delete(key.clone()));
                }
            }
            ops.push(BatchOperation::put(canonical_key, canonical_value));
        }

        if !ops.is_empty() {
            inner.store.atomic_batch_write(ops)?;
        }
        inner.records = winners;
        info!(
            "[ps-05] Compaction: {} scanned, {} rewritten, {} merged, {} quarantined",
            report.scanned, report.rewritten, report.merged, report.quarantined
        );
        Ok(report)
    }

    fn stats(&self) -> QueueStats {
        let inner = self.inner.read();
        let mut stats = QueueStats::default();
        for record in inner.records.values() {
            stats.count(record);
        }
        stats
    }

    fn len(&self) -> usize {
        self.inner.read().records.len()
    }
}

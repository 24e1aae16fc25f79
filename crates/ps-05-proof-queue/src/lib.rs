//! # PS-05 Durable Proof Queue
//!
//! Local store of signed proofs and their submission lifecycle. The only
//! component that owns submission state.
//!
//! **Stage:** 05
//! **Depends on:** shared types (proof shape), PS-01 (digest checks)
//!
//! ## Lifecycle
//!
//! | From | To | Trigger |
//! |------|----|---------|
//! | Pending | Submitted | transport accepted the proof or its batch |
//! | Pending | Failed | transport attempt failed |
//! | Failed | Submitted | retry succeeded (no reset needed) |
//! | Failed | Pending | `requeue_failed` |
//! | Submitted | Confirmed | ledger confirmed |
//! | Submitted | Failed | ledger reported an error |
//!
//! ## Error Policy
//!
//! Reads never fail: storage problems are logged and yield empty results.
//! Writes against a corrupted store fail with `QueueError::CorruptStore`.
//!
//! ## Storage
//!
//! Records are JSON under `proof:<hex digest>`. Key material is written as
//! base58 only; the decoder also accepts byte arrays and `{ "bytes": [...] }`
//! objects so older records normalise on load. `compact` rewrites them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DirectoryLock, FileBackedKVStore, InMemoryKVStore, LockError};
pub use config::QueueConfig;
pub use domain::{
    prefer_incoming, AppendOutcome, CompactionReport, ImportReport, QueueError, QueueSnapshot,
    QueueStats, StoreError, StoredProof, SubmissionState,
};
pub use ports::{BatchOperation, KeyValueStore, ProofQueueApi};
pub use service::{record_key, ProofQueue, QUARANTINE_PREFIX, RECORD_PREFIX};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

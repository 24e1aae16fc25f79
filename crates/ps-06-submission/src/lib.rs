//! # PS-06 Submission Orchestrator
//!
//! Moves queued proofs onto the ledger, one at a time or as a single
//! Merkle commitment, and tracks confirmation.
//!
//! **Stage:** 06
//! **Depends on:** PS-04 (batch roots), PS-05 (submission state)
//!
//! ## Modes
//!
//! | Mode | Transport call | Queue update |
//! |------|----------------|--------------|
//! | Single | `submit_single(proof)` | `Failed` per failed attempt, `Submitted` on success |
//! | Batch | `submit_commitment(root, count, range)` | all records `Submitted` in one write, or none |
//!
//! ## Retry
//!
//! Network errors are retried with exponential backoff and jitter
//! (`RetryConfig`). Rejections are final. A batch whose retries run out
//! leaves every record where it was.
//!
//! ## Confirmation
//!
//! `refresh_statuses` polls each outstanding reference once and moves its
//! records to `Confirmed` or `Failed`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryLedger;
pub use config::{LedgerConfig, RetryConfig, SubmissionConfig};
pub use domain::{
    BatchCommitment, BatchReceipt, DeviceStats, DrainReport, LedgerRejection, LedgerStatus,
    RefreshReport, SubmissionError, SubmissionMode, TransportError,
};
pub use ports::{LedgerTransport, MockLedgerTransport, SubmissionApi};
pub use service::SubmissionService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

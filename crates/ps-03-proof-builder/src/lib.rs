//! # PS-03 Proof Builder
//!
//! Combines the canonical encoder and the key custodian into signed proofs.
//!
//! **Stage:** 03
//! **Depends on:** PS-01 (encoding), PS-02 (custodian)
//!
//! ## Build Steps
//!
//! | Step | Failure |
//! |------|---------|
//! | Custodian must hold a session | `NotAuthorized` |
//! | Reading must come from the signing device | `DeviceMismatch` |
//! | Capture time not ahead of the clock (beyond skew) | `TimestampInFuture` |
//! | `bytes = encode(reading)` | `Encoding` |
//! | `signature = custodian.sign(handle, bytes)` | `SigningError` |
//! | `digest = keccak256(bytes)` | - |
//!
//! `verify_locally` never errors: any decode or verification problem is
//! reported as `false`.
//!
//! `build_batch` has partial-success semantics. A reading that fails is
//! logged and skipped; compare the output length with the input length to
//! detect drops, or use `build_batch_report` for the reasons.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::ProofBuilderConfig;
pub use domain::{BatchBuildReport, ProofError, SkippedReading};
pub use ports::ProofBuilderApi;
pub use service::{verify_proof, ProofBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

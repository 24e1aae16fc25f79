//! # Shared Types Crate
//!
//! Domain entities passed between the stages of the sensor-proof pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Reading` and `SignedProof` are defined once
//!   and consumed by the encoder, builder, aggregator, queue and submitter.
//! - **Closed payload shapes**: every sensor kind has exactly one payload
//!   record, so a kind/payload mismatch cannot be represented.
//! - **One key encoding**: device keys are 32 raw bytes, displayed and
//!   persisted as base58. Alternative encodings are accepted only when
//!   decoding, and never written back.

pub mod entities;
pub mod errors;
pub mod keys;
pub mod payload;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use keys::{DevicePublicKey, MerkleRoot, ProofDigest, SignatureBytes};
pub use payload::*;
pub use time::{MockTimeSource, SystemTimeSource, TimeSource, Timestamp};

//! # PS-01 Canonical Message Encoder
//!
//! Turns a typed sensor `Reading` into the exact bytes a device signs.
//!
//! **Stage:** 01
//! **Dependencies:** none beyond shared types and hashing
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Determinism | Payload fields sorted by name, minified JSON, `-0.0` folded to `0.0` |
//! | Injectivity | Every field is length-prefixed (default format) |
//! | Digest purity | `digest = keccak256(encode(reading))`, nothing else |
//!
//! ## Formats
//!
//! ```text
//! LengthPrefixed:  "PSv1" | len(kind) kind | len(ts) ts | len(payload) payload | len(device) device
//! Delimited:       kind|ts|payload|device
//! ```
//!
//! Lengths are big-endian `u32`. `Delimited` is the form the ledger program
//! rebuilds when it verifies a single proof; it refuses readings whose text
//! fields contain `|` instead of producing an ambiguous message.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoder;
pub mod errors;
pub mod format;

pub use encoder::{
    canonical_payload_json, compute_digest, digest_of, encode, encode_untyped,
    CanonicalEncoder,
};
pub use errors::EncodingError;
pub use format::{split_length_prefixed, CanonicalFormat, DELIMITER, DOMAIN_TAG};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

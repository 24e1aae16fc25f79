//! # Error Types
//!
//! Errors raised while constructing or decoding shared entities.

use thiserror::Error;

/// Errors decoding one of the fixed-length key/hash encodings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyFormatError {
    /// Input was not valid base58.
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),

    /// Input was not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded value had the wrong length.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors building a typed payload from an untyped field map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// A field held an object or array; payloads are flat.
    #[error("Field '{field}' is not a scalar value")]
    NonScalar { field: String },

    /// A numeric field was NaN or infinite.
    #[error("Field '{field}' is not a finite number")]
    NonFinite { field: String },

    /// The kind name is not recognised.
    #[error("Unknown sensor kind: {0}")]
    UnknownKind(String),

    /// The field map did not match the shape for its kind.
    #[error("Invalid {kind} payload: {reason}")]
    Shape { kind: String, reason: String },
}

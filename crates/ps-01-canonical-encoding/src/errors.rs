//! Encoder error types.

use shared_types::PayloadError;
use thiserror::Error;

/// A reading the encoder cannot canonicalize.
///
/// Not recoverable without fixing the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Payload field held an object or array.
    #[error("Payload field '{field}' is not a scalar")]
    NonScalarValue {
        /// Offending field name
        field: String,
    },

    /// Payload field was NaN or infinite.
    #[error("Payload field '{field}' is not a finite number")]
    NonFiniteNumber {
        /// Offending field name
        field: String,
    },

    /// Untyped payload did not match its kind.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Text field contains the delimiter of the delimited format.
    #[error("Field '{field}' contains the '|' delimiter")]
    DelimiterCollision {
        /// Offending field name
        field: String,
    },

    /// Encoded bytes did not follow the length-prefixed layout.
    #[error("Malformed canonical message: {0}")]
    Malformed(String),
}

impl From<PayloadError> for EncodingError {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::NonScalar { field } => EncodingError::NonScalarValue { field },
            PayloadError::NonFinite { field } => EncodingError::NonFiniteNumber { field },
            other => EncodingError::InvalidPayload(other.to_string()),
        }
    }
}

//! Proof construction errors.

use ps_01_canonical_encoding::EncodingError;
use ps_02_key_custodian::CustodianError;
use shared_types::DevicePublicKey;
use thiserror::Error;

/// Why a proof could not be built.
///
/// Distinct from submission failures: if this error is returned, no proof
/// exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// Custodian has no active session for the handle.
    #[error("Custodian is not authorized")]
    NotAuthorized,

    /// Custodian failed or rejected the signing call.
    #[error("Signing failed: {0}")]
    SigningError(String),

    /// Reading could not be canonicalized.
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Reading claims a device other than the signer.
    #[error("Reading device {reading} does not match signer {signer}")]
    DeviceMismatch {
        /// Device named in the reading
        reading: DevicePublicKey,
        /// Key of the custodian session
        signer: DevicePublicKey,
    },

    /// Capture time is ahead of the local clock.
    #[error("Capture time {captured_at_ms} is ahead of clock {now_ms}")]
    TimestampInFuture {
        /// Reading capture time
        captured_at_ms: u64,
        /// Local clock
        now_ms: u64,
    },
}

impl From<CustodianError> for ProofError {
    fn from(e: CustodianError) -> Self {
        match e {
            CustodianError::NotAuthorized
            | CustodianError::InvalidHandle
            | CustodianError::AuthorizationDeclined(_) => ProofError::NotAuthorized,
            CustodianError::StaleToken => ProofError::SigningError(e.to_string()),
            CustodianError::SigningError(reason) => ProofError::SigningError(reason),
        }
    }
}

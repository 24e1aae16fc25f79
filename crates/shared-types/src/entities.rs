//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Capture**: `Reading`
//! - **Attestation**: `SignedProof`
//! - **Ledger**: `LedgerReference`

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::PayloadError;
use crate::keys::{DevicePublicKey, ProofDigest, SignatureBytes};
use crate::payload::{ReadingPayload, SensorKind};

// =============================================================================
// CLUSTER A: CAPTURE
// =============================================================================

/// One typed physical measurement taken by one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Epoch milliseconds at which the sample was taken.
    pub captured_at_ms: u64,
    /// Typed measurement; also determines the sensor kind.
    pub payload: ReadingPayload,
    /// Public key of the capturing device.
    pub device_id: DevicePublicKey,
}

impl Reading {
    /// Create a new reading.
    pub fn new(payload: ReadingPayload, captured_at_ms: u64, device_id: DevicePublicKey) -> Self {
        Self {
            captured_at_ms,
            payload,
            device_id,
        }
    }

    /// Build a reading from an untyped flat field map.
    pub fn from_fields(
        kind: SensorKind,
        fields: &Map<String, Value>,
        captured_at_ms: u64,
        device_id: DevicePublicKey,
    ) -> Result<Self, PayloadError> {
        let payload = ReadingPayload::from_fields(kind, fields)?;
        Ok(Self::new(payload, captured_at_ms, device_id))
    }

    /// Sensor kind, derived from the payload.
    pub fn kind(&self) -> SensorKind {
        self.payload.kind()
    }
}

// =============================================================================
// CLUSTER B: ATTESTATION
// =============================================================================

/// A reading plus the device signature over its canonical encoding.
///
/// Immutable once built. Changing the reading means building a new proof
/// with a new digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedProof {
    reading: Reading,
    signature: SignatureBytes,
    signer_key: DevicePublicKey,
    digest: ProofDigest,
}

impl SignedProof {
    /// Assemble a proof from its parts.
    ///
    /// No verification happens here; the proof builder is the only producer
    /// that guarantees the parts belong together.
    pub fn from_parts(
        reading: Reading,
        signature: SignatureBytes,
        signer_key: DevicePublicKey,
        digest: ProofDigest,
    ) -> Self {
        Self {
            reading,
            signature,
            signer_key,
            digest,
        }
    }

    /// The signed reading.
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    /// Ed25519 signature over the canonical bytes.
    pub fn signature(&self) -> &SignatureBytes {
        &self.signature
    }

    /// Key that produced the signature.
    pub fn signer_key(&self) -> &DevicePublicKey {
        &self.signer_key
    }

    /// Content digest; the proof's primary identifier.
    pub fn digest(&self) -> &ProofDigest {
        &self.digest
    }

    /// Shorthand for `reading().kind()`.
    pub fn kind(&self) -> SensorKind {
        self.reading.kind()
    }

    /// Shorthand for `reading().captured_at_ms`.
    pub fn captured_at_ms(&self) -> u64 {
        self.reading.captured_at_ms
    }
}

// =============================================================================
// CLUSTER C: LEDGER
// =============================================================================

/// Transaction identifier returned by the ledger transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerReference(pub String);

impl LedgerReference {
    /// Wrap a transport-issued reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Reference as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LedgerReference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

//! # Proof Builder Configuration

use ps_01_canonical_encoding::CanonicalFormat;
use serde::{Deserialize, Serialize};

/// Proof builder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofBuilderConfig {
    /// Layout of the signed message.
    pub format: CanonicalFormat,
    /// How far ahead of the local clock a capture time may be, in ms.
    pub max_clock_skew_ms: u64,
}

impl Default for ProofBuilderConfig {
    fn default() -> Self {
        Self {
            format: CanonicalFormat::LengthPrefixed,
            max_clock_skew_ms: 30_000,
        }
    }
}

impl ProofBuilderConfig {
    /// No skew tolerance.
    pub fn for_testing() -> Self {
        Self {
            max_clock_skew_ms: 0,
            ..Self::default()
        }
    }
}

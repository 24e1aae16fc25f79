//! # Queue Configuration

use ps_01_canonical_encoding::CanonicalFormat;
use serde::{Deserialize, Serialize};

/// Proof queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Canonical layout the stored digests were computed with.
    pub format: CanonicalFormat,
    /// Recompute digests on import and compaction.
    pub verify_digests: bool,
    /// Store file name inside the queue directory.
    pub store_file: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            format: CanonicalFormat::LengthPrefixed,
            verify_digests: true,
            store_file: "proofs.db".to_string(),
        }
    }
}

impl QueueConfig {
    /// Skips digest checks so tests can store hand-made proofs.
    pub fn for_testing() -> Self {
        Self {
            verify_digests: false,
            ..Self::default()
        }
    }
}

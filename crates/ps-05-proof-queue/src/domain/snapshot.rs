//! Export/import snapshot format.
//!
//! ```json
//! { "format": "ps-proof-queue", "version": 1, "exported_at_ms": 0, "records": [ ... ] }
//! ```
//!
//! A bare JSON array of records is also accepted on import.

use serde::{Deserialize, Serialize};
use shared_types::Timestamp;

use super::entities::StoredProof;
use super::errors::QueueError;

/// Format marker written into every snapshot.
pub const SNAPSHOT_FORMAT: &str = "ps-proof-queue";

/// Current snapshot version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized queue contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Snapshot format tag.
    pub format: String,
    /// Snapshot format version.
    pub version: u32,
    /// Export time, epoch ms.
    pub exported_at_ms: Timestamp,
    /// Every record at export time.
    pub records: Vec<StoredProof>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnySnapshot {
    Envelope(QueueSnapshot),
    Bare(Vec<StoredProof>),
}

impl QueueSnapshot {
    /// Snapshot of `records` in the current format.
    pub fn new(records: Vec<StoredProof>, exported_at_ms: Timestamp) -> Self {
        Self {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            exported_at_ms,
            records,
        }
    }

    /// Parse snapshot bytes, normalising key encodings on the way in.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, QueueError> {
        let parsed: AnySnapshot =
            serde_json::from_slice(bytes).map_err(|e| QueueError::Snapshot(e.to_string()))?;
        match parsed {
            AnySnapshot::Bare(records) => Ok(Self::new(records, 0)),
            AnySnapshot::Envelope(snapshot) => {
                if snapshot.format != SNAPSHOT_FORMAT {
                    return Err(QueueError::Snapshot(format!(
                        "unknown format {:?}",
                        snapshot.format
                    )));
                }
                if snapshot.version > SNAPSHOT_VERSION {
                    return Err(QueueError::Snapshot(format!(
                        "unsupported version {}",
                        snapshot.version
                    )));
                }
                Ok(snapshot)
            }
        }
    }

    /// Serialize as JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, QueueError> {
        serde_json::to_vec(self).map_err(|e| QueueError::Snapshot(e.to_string()))
    }
}

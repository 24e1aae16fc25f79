//! # Domain Layer

pub mod entities;
pub mod errors;
pub mod merge;
pub mod snapshot;

pub use entities::{
    AppendOutcome, CompactionReport, ImportReport, QueueStats, StoredProof, SubmissionState,
};
pub use errors::{QueueError, StoreError};
pub use merge::prefer_incoming;
pub use snapshot::{QueueSnapshot, SNAPSHOT_FORMAT, SNAPSHOT_VERSION};

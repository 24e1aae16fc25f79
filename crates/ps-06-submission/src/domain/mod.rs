//! # Domain Layer

pub mod entities;
pub mod errors;

pub use entities::{
    BatchCommitment, BatchReceipt, DeviceStats, DrainReport, LedgerStatus, RefreshReport,
    SubmissionMode,
};
pub use errors::{LedgerRejection, SubmissionError, TransportError};

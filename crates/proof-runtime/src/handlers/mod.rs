//! # Pipeline Handlers
//!
//! Long-running tasks that move data between stages.

pub mod capture;
pub mod submission;

pub use capture::{CaptureHandler, CaptureSummary};
pub use submission::{CycleReport, SubmissionHandler, MAX_DRAIN_ROUNDS};

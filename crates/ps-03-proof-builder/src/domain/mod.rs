//! # Domain Layer

pub mod entities;
pub mod errors;

pub use entities::{BatchBuildReport, SkippedReading};
pub use errors::ProofError;

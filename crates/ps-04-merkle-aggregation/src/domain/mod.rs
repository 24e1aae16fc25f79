//! # Domain Layer

pub mod entities;
pub mod errors;

pub use entities::{InclusionProof, MerkleBatch, Position, ProofNode};
pub use errors::AggregationError;

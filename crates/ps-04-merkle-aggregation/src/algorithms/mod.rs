//! # Algorithms
//!
//! Pure computation over already-validated proofs.

pub mod leaf;
pub mod tree;

pub use leaf::{leaf_hash, serialize_proof, LEAF_DOMAIN_TAG, PARALLEL_THRESHOLD};
pub use tree::{build_levels, root_from_path, verify_inclusion};

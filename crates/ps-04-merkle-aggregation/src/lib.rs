//! # PS-04 Merkle Aggregator
//!
//! Hashes signed proofs into leaves, builds a binary Keccak-256 Merkle tree
//! and derives inclusion paths, so the ledger stores one root per batch and
//! anyone can check a single proof with `O(log n)` hashes.
//!
//! **Stage:** 04
//! **Depends on:** shared types and hashing only
//!
//! ## Tree Rules
//!
//! | Rule | Detail |
//! |------|--------|
//! | Leaf | `keccak256(serialize_proof(proof))` |
//! | Node | `keccak256(left \|\| right)` |
//! | Odd level | last node is paired with itself |
//! | Root | `levels[last][0]`; a single leaf is its own root |
//!
//! Path verification walks the index parity (`even → hash(cur, sib)`,
//! `odd → hash(sib, cur)`, then `index /= 2`), the same walk the ledger
//! program performs.
//!
//! ## Module Structure
//!
//! ```text
//! ps-04-merkle-aggregation/
//! ├── domain/       # MerkleBatch, InclusionProof, ProofNode, AggregationError
//! └── algorithms/   # leaf serialization, tree construction, path verification
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;

pub use algorithms::{
    build_levels, leaf_hash, root_from_path, serialize_proof, verify_inclusion, LEAF_DOMAIN_TAG,
    PARALLEL_THRESHOLD,
};
pub use domain::{AggregationError, InclusionProof, MerkleBatch, Position, ProofNode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # Leaf Serialization
//!
//! Stable full-proof encoding, distinct from the reading-only canonical
//! message. The reading enters through its digest (a pure function of the
//! whole reading) plus the fields a verifier needs without the payload.
//!
//! ```text
//! "PSLEAF1" | digest[32] | signature[64] | signer_key[32]
//!           | captured_at_ms[8, BE] | device_id[32] | len(kind)[4, BE] kind
//! ```

use rayon::prelude::*;
use shared_crypto::{keccak256, Hash};
use shared_types::SignedProof;

/// Domain tag opening every leaf preimage.
pub const LEAF_DOMAIN_TAG: &[u8; 7] = b"PSLEAF1";

/// Batches at or above this size hash their leaves in parallel.
pub const PARALLEL_THRESHOLD: usize = 256;

/// Stable byte encoding of a full proof.
pub fn serialize_proof(proof: &SignedProof) -> Vec<u8> {
    let kind = proof.kind().as_str().as_bytes();
    let mut out = Vec::with_capacity(LEAF_DOMAIN_TAG.len() + 32 + 64 + 32 + 8 + 32 + 4 + kind.len());

    out.extend_from_slice(LEAF_DOMAIN_TAG);
    out.extend_from_slice(proof.digest().as_bytes());
    out.extend_from_slice(proof.signature().as_bytes());
    out.extend_from_slice(proof.signer_key().as_bytes());
    out.extend_from_slice(&proof.captured_at_ms().to_be_bytes());
    out.extend_from_slice(proof.reading().device_id.as_bytes());
    out.extend_from_slice(&(kind.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out
}

/// Leaf hash of one proof.
pub fn leaf_hash(proof: &SignedProof) -> Hash {
    keccak256(&serialize_proof(proof))
}

/// Leaf hashes in input order.
pub(crate) fn leaf_hashes(proofs: &[SignedProof]) -> Vec<Hash> {
    if proofs.len() >= PARALLEL_THRESHOLD {
        proofs.par_iter().map(leaf_hash).collect()
    } else {
        proofs.iter().map(leaf_hash).collect()
    }
}

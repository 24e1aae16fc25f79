//! Merkle batch entities.

use serde::{Deserialize, Serialize};
use shared_crypto::Hash;
use shared_types::{MerkleRoot, SignedProof};

use crate::algorithms::leaf::leaf_hashes;
use crate::algorithms::tree::{build_levels, verify_inclusion};
use crate::domain::errors::AggregationError;

/// Position of a sibling relative to the path node.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Position {
    /// Sibling is on the left.
    Left,
    /// Sibling is on the right.
    Right,
}

/// Node in an inclusion path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofNode {
    /// Hash of the sibling node.
    pub hash: Hash,
    /// Position of the sibling.
    pub position: Position,
}

/// Self-contained inclusion proof for one leaf.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InclusionProof {
    /// Leaf being proven.
    pub leaf: Hash,
    /// Leaf position in the batch.
    pub index: usize,
    /// Siblings, leaf to root.
    pub path: Vec<ProofNode>,
    /// Batch root.
    pub root: Hash,
}

impl InclusionProof {
    /// Walk the path using the recorded sibling positions.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf;
        for node in &self.path {
            current = match node.position {
                Position::Left => shared_crypto::keccak256_pair(&node.hash, &current),
                Position::Right => shared_crypto::keccak256_pair(&current, &node.hash),
            };
        }
        current == self.root
    }

    /// Sibling hashes only, for index-parity verification.
    pub fn sibling_hashes(&self) -> Vec<Hash> {
        self.path.iter().map(|n| n.hash).collect()
    }
}

/// A Merkle tree over one submission's proofs.
///
/// Transient: owned by the submission call that created it. Only the root
/// is persisted, per proof, by the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleBatch {
    levels: Vec<Vec<Hash>>,
}

impl MerkleBatch {
    /// Hash `proofs` into leaves and build the tree.
    ///
    /// # Errors
    /// * `AggregationError::EmptyBatch` - `proofs` is empty
    pub fn compute(proofs: &[SignedProof]) -> Result<Self, AggregationError> {
        if proofs.is_empty() {
            return Err(AggregationError::EmptyBatch);
        }
        Self::from_leaves(leaf_hashes(proofs))
    }

    /// Build the tree over precomputed leaf hashes.
    pub fn from_leaves(leaves: Vec<Hash>) -> Result<Self, AggregationError> {
        if leaves.is_empty() {
            return Err(AggregationError::EmptyBatch);
        }
        Ok(Self {
            levels: build_levels(leaves),
        })
    }

    /// Leaf hashes, in proof order.
    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    /// Every level, leaves first.
    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.levels[0].len()
    }

    /// Always false; empty batches cannot be built.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Root hash.
    pub fn root(&self) -> Hash {
        self.levels[self.levels.len() - 1][0]
    }

    /// Root as a typed value for persistence and display.
    pub fn merkle_root(&self) -> MerkleRoot {
        MerkleRoot::from_bytes(self.root())
    }

    /// Sibling hashes for the leaf at `index`, ordered leaf to root.
    ///
    /// The duplicated odd node is its own sibling.
    pub fn proof_path(&self, index: usize) -> Result<Vec<Hash>, AggregationError> {
        self.inclusion_proof(index).map(|p| p.sibling_hashes())
    }

    /// Full inclusion proof for the leaf at `index`.
    pub fn inclusion_proof(&self, index: usize) -> Result<InclusionProof, AggregationError> {
        if index >= self.len() {
            return Err(AggregationError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let node = if idx % 2 == 0 {
                // Right sibling, or self when this is the odd last node
                let hash = level.get(idx + 1).unwrap_or(&level[idx]);
                ProofNode {
                    hash: *hash,
                    position: Position::Right,
                }
            } else {
                ProofNode {
                    hash: level[idx - 1],
                    position: Position::Left,
                }
            };
            path.push(node);
            idx /= 2;
        }

        Ok(InclusionProof {
            leaf: self.levels[0][index],
            index,
            path,
            root: self.root(),
        })
    }

    /// Whether the leaf at `index` verifies against this batch's root.
    pub fn verify_leaf(&self, index: usize) -> bool {
        match self.proof_path(index) {
            Ok(path) => verify_inclusion(&self.levels[0][index], &path, index, &self.root()),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::leaf::leaf_hash;
    use crate::algorithms::tree::root_from_path;
    use proptest::prelude::*;
    use shared_crypto::keccak256_pair;
    use shared_types::{
        DevicePublicKey, GpsFix, ProofDigest, Reading, ReadingPayload, SignatureBytes,
    };

    fn make_hash(n: u8) -> Hash {
        let mut h = [0u8; 32];
        h[0] = n;
        h
    }

    fn proof(n: u64) -> SignedProof {
        let device = DevicePublicKey::from_bytes([8u8; 32]);
        SignedProof::from_parts(
            Reading::new(
                ReadingPayload::Gps(GpsFix {
                    latitude: n as f64,
                    longitude: 0.0,
                    altitude_m: None,
                    accuracy_m: None,
                    speed_mps: None,
                }),
                n,
                device,
            ),
            SignatureBytes::from_bytes([n as u8; 64]),
            device,
            ProofDigest::from_bytes([n as u8; 32]),
        )
    }

    // ========== Test Group 1: Construction ==========

    #[test]
    fn test_empty_batch_rejected() {
        assert_eq!(MerkleBatch::compute(&[]), Err(AggregationError::EmptyBatch));
        assert_eq!(MerkleBatch::from_leaves(vec![]), Err(AggregationError::EmptyBatch));
    }

    #[test]
    fn test_single_proof_root_is_leaf() {
        let batch = MerkleBatch::compute(&[proof(1)]).unwrap();
        assert_eq!(batch.root(), batch.leaves()[0]);
        assert_eq!(batch.root(), leaf_hash(&proof(1)));
        assert!(batch.proof_path(0).unwrap().is_empty());
    }

    #[test]
    fn test_three_leaves_duplicates_last_once() {
        let (a, b, c) = (make_hash(1), make_hash(2), make_hash(3));
        let batch = MerkleBatch::from_leaves(vec![a, b, c]).unwrap();

        assert_eq!(batch.levels()[0], vec![a, b, c]);
        assert_eq!(batch.levels()[1], vec![keccak256_pair(&a, &b), keccak256_pair(&c, &c)]);
        let expected_root = keccak256_pair(&keccak256_pair(&a, &b), &keccak256_pair(&c, &c));
        assert_eq!(batch.root(), expected_root);

        // c's first sibling is itself
        assert_eq!(batch.proof_path(2).unwrap()[0], c);
    }

    #[test]
    fn test_leaf_order_is_significant() {
        let forward = MerkleBatch::compute(&[proof(1), proof(2)]).unwrap();
        let reverse = MerkleBatch::compute(&[proof(2), proof(1)]).unwrap();
        assert_ne!(forward.root(), reverse.root());
    }

    // ========== Test Group 2: Paths ==========

    #[test]
    fn test_every_leaf_verifies_for_sizes_1_to_9() {
        for n in 1..=9u64 {
            let proofs: Vec<_> = (0..n).map(proof).collect();
            let batch = MerkleBatch::compute(&proofs).unwrap();
            for i in 0..n as usize {
                let path = batch.proof_path(i).unwrap();
                assert_eq!(
                    root_from_path(&leaf_hash(&proofs[i]), &path, i),
                    batch.root(),
                    "size {} index {}",
                    n,
                    i
                );
                assert!(batch.inclusion_proof(i).unwrap().verify());
            }
        }
    }

    #[test]
    fn test_index_out_of_range() {
        let batch = MerkleBatch::compute(&[proof(1), proof(2)]).unwrap();
        assert_eq!(
            batch.proof_path(2),
            Err(AggregationError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(!batch.verify_leaf(2));
    }

    #[test]
    fn test_tampered_path_rejected() {
        let batch = MerkleBatch::compute(&[proof(1), proof(2), proof(3)]).unwrap();
        let mut inclusion = batch.inclusion_proof(1).unwrap();
        inclusion.path[0].hash = make_hash(99);
        assert!(!inclusion.verify());
    }

    proptest! {
        #[test]
        fn prop_inclusion_roundtrip(n in 1usize..64, pick in 0usize..64) {
            let leaves: Vec<Hash> = (0..n).map(|i| shared_crypto::keccak256(&i.to_be_bytes())).collect();
            let batch = MerkleBatch::from_leaves(leaves.clone()).unwrap();
            let i = pick % n;
            let path = batch.proof_path(i).unwrap();
            prop_assert!(verify_inclusion(&leaves[i], &path, i, &batch.root()));
            prop_assert_eq!(path.len(), batch.levels().len() - 1);
        }
    }
}

//! # Keccak-256 Hashing
//!
//! Content digests and Merkle node hashing.
//!
//! Merkle internal nodes are `keccak256(left || right)` with no domain
//! separation byte, matching the ledger program's inclusion check.

use sha3::{Digest, Keccak256};

/// Keccak-256 output (256-bit).
pub type Hash = [u8; 32];

/// Stateful Keccak-256 hasher.
pub struct KeccakHasher {
    inner: Keccak256,
}

impl KeccakHasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Keccak256::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for KeccakHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with Keccak-256 (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Hash multiple inputs as one concatenated message.
pub fn keccak256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = KeccakHasher::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize()
}

/// Hash two nodes: `keccak256(left || right)`.
pub fn keccak256_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

//! # Tree Construction and Path Verification

use shared_crypto::{keccak256_pair, Hash};

/// All levels of the tree, leaves first, root last.
///
/// `leaves` must be non-empty.
pub fn build_levels(leaves: Vec<Hash>) -> Vec<Vec<Hash>> {
    let mut levels = vec![leaves];

    while levels.last().map_or(false, |level| level.len() > 1) {
        let level = &levels[levels.len() - 1];
        let mut next_level = Vec::with_capacity((level.len() + 1) / 2);

        for chunk in level.chunks(2) {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left); // Duplicate last if odd
            next_level.push(keccak256_pair(left, right));
        }

        levels.push(next_level);
    }

    levels
}

/// Recompute the root from a leaf, its sibling path and its index.
///
/// At each level an even index means the current node is the left child.
pub fn root_from_path(leaf: &Hash, path: &[Hash], index: usize) -> Hash {
    let mut current = *leaf;
    let mut idx = index;

    for sibling in path {
        current = if idx % 2 == 0 {
            keccak256_pair(&current, sibling)
        } else {
            keccak256_pair(sibling, &current)
        };
        idx /= 2;
    }

    current
}

/// Whether `leaf` at `index` is included under `root`.
pub fn verify_inclusion(leaf: &Hash, path: &[Hash], index: usize, root: &Hash) -> bool {
    root_from_path(leaf, path, index) == *root
}

//! Inclusion proofs for commitment trees

use crate::hash;
use serde::{Deserialize, Serialize};

/// Audit path from a leaf to the root.
///
/// Each slot holds the sibling hash for one level, bottom-up. `None` marks a
/// level where the node had no sibling and was promoted unchanged; the index
/// still halves at that level, which keeps left/right placement determined
/// by the leaf index alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    path: Vec<Option<String>>,
}

impl InclusionProof {
    pub fn new(path: Vec<Option<String>>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &[Option<String>] {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Recombine `leaf_hash` along the path and compare with `root_hash`.
    pub fn verify(&self, leaf_hash: &str, root_hash: &str, leaf_index: usize) -> bool {
        if root_hash.is_empty() {
            return false;
        }

        let mut current = leaf_hash.to_string();
        let mut index = leaf_index;

        for step in &self.path {
            match step {
                Some(sibling) if index % 2 == 0 => current = hash::combine_pair(&current, sibling),
                Some(sibling) => current = hash::combine_pair(sibling, &current),
                // A right child always has a left sibling.
                None if index % 2 == 1 => return false,
                None => {}
            }
            index /= 2;
        }

        index == 0 && current == root_hash
    }
}

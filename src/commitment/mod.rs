//! Commitment Tree
//!
//! A binary Merkle tree over an ordered sequence of leaf hashes (normally the
//! leaf hashes of a region tree). Nodes live in a per-level arena:
//! `levels[0]` holds the leaves and the last level holds the root, so the
//! node at `(level, index)` covers leaves `index << level .. (index + 1) << level`.

pub mod proof;

pub use proof::InclusionProof;

use crate::error::CommitmentError;
use crate::hash;
use crate::region::RegionTree;
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// What happens to the last node of a level with an odd node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddNodePolicy {
    /// Carry the node to the next level unchanged.
    ///
    /// Root hashes of existing versions were computed this way.
    #[default]
    Promote,
    /// Pair the node with itself: parent = H(node || node).
    Duplicate,
}

/// Merkle tree over leaf hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentTree {
    levels: Vec<Vec<Hash>>,
    policy: OddNodePolicy,
}

/// Borrowed view of one node in the arena.
#[derive(Debug, Clone, Copy)]
pub struct CommitmentNode<'a> {
    tree: &'a CommitmentTree,
    level: usize,
    index: usize,
}

impl<'a> CommitmentNode<'a> {
    pub fn hash(&self) -> &'a str {
        &self.tree.levels[self.level][self.index]
    }

    pub fn is_leaf(&self) -> bool {
        self.level == 0
    }

    /// Leaf indices covered by this node.
    pub fn leaf_range(&self) -> Range<usize> {
        let start = self.index << self.level;
        let end = ((self.index + 1) << self.level).min(self.tree.leaf_count());
        start..end
    }

    /// Child nodes.
    ///
    /// A promoted node has no children of its own at this level; it is the
    /// same node as its single predecessor, which is returned on the left.
    pub fn children(&self) -> Option<(CommitmentNode<'a>, Option<CommitmentNode<'a>>)> {
        if self.level == 0 {
            return None;
        }
        let below = &self.tree.levels[self.level - 1];
        let left = CommitmentNode {
            tree: self.tree,
            level: self.level - 1,
            index: self.index * 2,
        };
        let right = (self.index * 2 + 1 < below.len()).then(|| CommitmentNode {
            tree: self.tree,
            level: self.level - 1,
            index: self.index * 2 + 1,
        });
        Some((left, right))
    }
}

impl CommitmentTree {
    /// Build a tree with the default odd-node policy.
    pub fn build(leaf_hashes: Vec<Hash>) -> Self {
        Self::build_with_policy(leaf_hashes, OddNodePolicy::default())
    }

    /// Build a tree, pairing adjacent nodes left to right until one remains.
    pub fn build_with_policy(leaf_hashes: Vec<Hash>, policy: OddNodePolicy) -> Self {
        let mut levels = vec![leaf_hashes];

        while levels.last().map(Vec::len).unwrap_or(0) > 1 {
            let current = levels.last().map(Vec::as_slice).unwrap_or_default();
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                match pair {
                    [left, right] => next.push(hash::combine_pair(left, right)),
                    [odd] => match policy {
                        OddNodePolicy::Promote => next.push(odd.clone()),
                        OddNodePolicy::Duplicate => next.push(hash::combine_pair(odd, odd)),
                    },
                    _ => unreachable!("chunks(2) yields one or two elements"),
                }
            }
            levels.push(next);
        }

        Self { levels, policy }
    }

    /// Build over the leaf hashes of a region tree.
    pub fn from_region_tree(tree: &RegionTree, policy: OddNodePolicy) -> Self {
        Self::build_with_policy(tree.leaf_hashes(), policy)
    }

    pub fn policy(&self) -> OddNodePolicy {
        self.policy
    }

    pub fn leaves(&self) -> &[Hash] {
        &self.levels[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count() == 0
    }

    /// Root hash; empty when the tree has no leaves.
    pub fn root_hash(&self) -> &str {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn root(&self) -> Option<CommitmentNode<'_>> {
        if self.is_empty() {
            return None;
        }
        Some(CommitmentNode {
            tree: self,
            level: self.levels.len() - 1,
            index: 0,
        })
    }

    /// Number of levels including the leaf level.
    pub fn height(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.levels.len()
        }
    }

    /// Leaf indices whose hashes differ, in ascending order.
    ///
    /// Both trees must have the same leaf count and odd-node policy.
    pub fn find_differences(&self, other: &CommitmentTree) -> Result<Vec<usize>, CommitmentError> {
        if self.leaf_count() != other.leaf_count() {
            return Err(CommitmentError::LeafCountMismatch {
                left: self.leaf_count(),
                right: other.leaf_count(),
            });
        }
        if self.policy != other.policy {
            return Err(CommitmentError::PolicyMismatch);
        }

        let mut indices = Vec::new();
        if let (Some(a), Some(b)) = (self.root(), other.root()) {
            diff_nodes(a, b, &mut indices);
        }
        Ok(indices)
    }

    /// Audit path for one leaf, one slot per level below the root.
    pub fn proof(&self, leaf_index: usize) -> Result<InclusionProof, CommitmentError> {
        if leaf_index >= self.leaf_count() {
            return Err(CommitmentError::IndexOutOfRange {
                index: leaf_index,
                len: self.leaf_count(),
            });
        }

        let mut path = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            let step = if sibling < level.len() {
                Some(level[sibling].clone())
            } else {
                match self.policy {
                    OddNodePolicy::Promote => None,
                    OddNodePolicy::Duplicate => Some(level[index].clone()),
                }
            };
            path.push(step);
            index /= 2;
        }

        Ok(InclusionProof::new(path))
    }

    /// Check that `leaf_hash` sits at `leaf_index` under `root_hash`.
    pub fn verify_proof(
        leaf_hash: &str,
        proof: &InclusionProof,
        root_hash: &str,
        leaf_index: usize,
    ) -> bool {
        proof.verify(leaf_hash, root_hash, leaf_index)
    }
}

fn diff_nodes(a: CommitmentNode<'_>, b: CommitmentNode<'_>, indices: &mut Vec<usize>) {
    if a.hash() == b.hash() {
        return;
    }
    match (a.children(), b.children()) {
        (Some((al, ar)), Some((bl, br))) => {
            diff_nodes(al, bl, indices);
            if let (Some(ar), Some(br)) = (ar, br) {
                diff_nodes(ar, br, indices);
            }
        }
        _ => indices.extend(a.leaf_range()),
    }
}

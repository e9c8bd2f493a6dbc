//! Commitment trees built over region-tree leaves

use super::test_utils::noise;
use tessera::commitment::{CommitmentTree, OddNodePolicy};
use tessera::hash::{combine_pair, compute_hash};
use tessera::{RegionParams, RegionTree};

#[test]
fn test_odd_leaf_root() {
    let leaves: Vec<String> = ["h1", "h2", "h3"].iter().map(|s| compute_hash(s.as_bytes())).collect();
    let tree = CommitmentTree::build(leaves.clone());
    let expected = combine_pair(&combine_pair(&leaves[0], &leaves[1]), &leaves[2]);
    assert_eq!(tree.root_hash(), expected);
}

#[test]
fn test_duplicate_policy_changes_root_only_for_odd_levels() {
    let even: Vec<String> = (0..8u8).map(|i| compute_hash(&[i])).collect();
    assert_eq!(
        CommitmentTree::build_with_policy(even.clone(), OddNodePolicy::Promote).root_hash(),
        CommitmentTree::build_with_policy(even, OddNodePolicy::Duplicate).root_hash()
    );

    let odd: Vec<String> = (0..5u8).map(|i| compute_hash(&[i])).collect();
    assert_ne!(
        CommitmentTree::build_with_policy(odd.clone(), OddNodePolicy::Promote).root_hash(),
        CommitmentTree::build_with_policy(odd, OddNodePolicy::Duplicate).root_hash()
    );
}

#[test]
fn test_every_region_leaf_is_provable() {
    let image = noise(40, 24, 11);
    let regions = RegionTree::build(&image, &RegionParams::new(6, 4, 10.0)).unwrap();

    for policy in [OddNodePolicy::Promote, OddNodePolicy::Duplicate] {
        let tree = CommitmentTree::from_region_tree(&regions, policy);
        assert_eq!(tree.leaf_count(), regions.leaf_count());
        for (index, leaf) in tree.leaves().iter().enumerate() {
            let proof = tree.proof(index).unwrap();
            assert!(CommitmentTree::verify_proof(leaf, &proof, tree.root_hash(), index));
        }
    }
}

#[test]
fn test_proof_does_not_verify_against_other_root() {
    let a: Vec<String> = (0..6u8).map(|i| compute_hash(&[i])).collect();
    let mut b = a.clone();
    b[4] = compute_hash(b"changed");

    let tree_a = CommitmentTree::build(a.clone());
    let tree_b = CommitmentTree::build(b);
    let proof = tree_a.proof(1).unwrap();
    assert!(CommitmentTree::verify_proof(&a[1], &proof, tree_a.root_hash(), 1));
    assert!(!CommitmentTree::verify_proof(&a[1], &proof, tree_b.root_hash(), 1));
    assert_eq!(tree_a.find_differences(&tree_b).unwrap(), vec![4]);
}

#[test]
fn test_empty_tree() {
    let tree = CommitmentTree::build(Vec::new());
    assert!(tree.is_empty());
    assert_eq!(tree.root_hash(), "");
    assert!(tree.proof(0).is_err());
}

//! Commitment tree proofs and diffs

use proptest::prelude::*;
use tessera::commitment::{CommitmentTree, OddNodePolicy};
use tessera::hash::compute_hash;

fn leaves_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(any::<[u8; 8]>(), 1..70)
        .prop_map(|raw| raw.iter().map(|bytes| compute_hash(bytes)).collect())
}

fn policy_strategy() -> impl Strategy<Value = OddNodePolicy> {
    prop_oneof![Just(OddNodePolicy::Promote), Just(OddNodePolicy::Duplicate)]
}

fn flip_first_bit(hash: &str) -> String {
    let mut bytes = hex::decode(hash).unwrap();
    bytes[0] ^= 0x01;
    hex::encode(bytes)
}

#[test]
fn test_every_proof_verifies() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(leaves_strategy(), policy_strategy()), |(leaves, policy)| {
            let tree = CommitmentTree::build_with_policy(leaves.clone(), policy);
            for (index, leaf) in leaves.iter().enumerate() {
                let proof = tree.proof(index).unwrap();
                prop_assert!(proof.verify(leaf, tree.root_hash(), index));
                prop_assert!(!proof.verify(&flip_first_bit(leaf), tree.root_hash(), index));
            }
            prop_assert!(tree.proof(leaves.len()).is_err());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_tampered_path_fails() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(leaves_strategy(), policy_strategy(), any::<prop::sample::Index>()),
            |(leaves, policy, pick)| {
                prop_assume!(leaves.len() > 1);
                let tree = CommitmentTree::build_with_policy(leaves.clone(), policy);
                let index = pick.index(leaves.len());
                let proof = tree.proof(index).unwrap();

                let Some(slot) = proof.path().iter().position(Option::is_some) else {
                    return Ok(());
                };
                let mut path = proof.path().to_vec();
                path[slot] = path[slot].as_deref().map(flip_first_bit);
                let tampered = tessera::InclusionProof::new(path);

                prop_assert!(!tampered.verify(&leaves[index], tree.root_hash(), index));
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn test_differences_match_changed_leaves() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(leaves_strategy(), policy_strategy(), prop::collection::vec(any::<prop::sample::Index>(), 0..6)),
            |(leaves, policy, picks)| {
                let mut changed: Vec<usize> = picks.iter().map(|p| p.index(leaves.len())).collect();
                changed.sort_unstable();
                changed.dedup();

                let mut edited = leaves.clone();
                for &index in &changed {
                    edited[index] = flip_first_bit(&edited[index]);
                }

                let a = CommitmentTree::build_with_policy(leaves, policy);
                let b = CommitmentTree::build_with_policy(edited, policy);

                prop_assert_eq!(a.find_differences(&b).unwrap(), changed.clone());
                prop_assert_eq!(a.root_hash() == b.root_hash(), changed.is_empty());
                Ok(())
            },
        )
        .unwrap();
}

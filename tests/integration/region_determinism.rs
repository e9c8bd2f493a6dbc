//! Region tree construction and comparison on realistic images

use super::test_utils::{flat, noise, paint};
use tessera::commitment::CommitmentTree;
use tessera::error::RegionError;
use tessera::{Region, RegionParams, RegionTree};

#[test]
fn test_uniform_image_is_single_leaf() {
    let image = flat(16, 16, 120);
    let tree = RegionTree::build(&image, &RegionParams::new(8, 8, 10.0)).unwrap();
    assert!(tree.root().is_leaf());
    assert_eq!(tree.leaf_count(), 1);
    assert_eq!(tree.leaf_regions(), vec![Region::new(0, 0, 16, 16)]);
}

#[test]
fn test_rebuild_is_deterministic() {
    let image = noise(57, 43, 3);
    let params = RegionParams::new(6, 3, 10.0);
    let first = RegionTree::build(&image, &params).unwrap();
    let second = RegionTree::build(&image, &params).unwrap();
    assert_eq!(first.leaf_hashes(), second.leaf_hashes());
    assert_eq!(first.root_hash(), second.root_hash());

    let sequential = RegionTree::build(&image, &params.clone().with_parallel_depth(0)).unwrap();
    assert_eq!(sequential.root_hash(), first.root_hash());
}

#[test]
fn test_mixed_image_subdivides_only_busy_areas() {
    let mut image = flat(64, 64, 30);
    let textured = noise(16, 16, 9);
    for y in 0..16 {
        for x in 0..16 {
            image.set_pixel(48 + x, 48 + y, textured.pixel(x, y));
        }
    }

    let tree = RegionTree::build(&image, &RegionParams::new(8, 4, 10.0)).unwrap();
    let leaves = tree.leaf_regions();
    assert!(leaves.contains(&Region::new(0, 0, 32, 32)));
    assert!(leaves.iter().any(|r| r.width == 4 && r.x >= 48 && r.y >= 48));

    let covered: u64 = leaves.iter().map(Region::area).sum();
    assert_eq!(covered, 64 * 64);
}

#[test]
fn test_edit_is_localized_and_matches_commitment() {
    let params = RegionParams::new(8, 4, 10.0);
    let before = noise(64, 64, 1);
    let mut after = before.clone();
    paint(&mut after, 5, 5, 2, 2, [0, 0, 0]);

    let left = RegionTree::build(&before, &params).unwrap();
    let right = RegionTree::build(&after, &params).unwrap();
    let regions = left.find_different_regions(&right).unwrap();
    assert!(!regions.is_empty());
    assert!(regions.iter().all(|r| r.intersects(&Region::new(5, 5, 2, 2))));

    let left_commitment = CommitmentTree::build(left.leaf_hashes());
    let right_commitment = CommitmentTree::build(right.leaf_hashes());
    assert_ne!(left_commitment.root_hash(), right_commitment.root_hash());
    let changed = left_commitment.find_differences(&right_commitment).unwrap();
    assert_eq!(changed.len(), regions.len());
}

#[test]
fn test_threshold_mismatch_is_rejected() {
    let image = noise(32, 32, 4);
    let left = RegionTree::build(&image, &RegionParams::new(8, 4, 10.0)).unwrap();
    let right = RegionTree::build(&image, &RegionParams::new(8, 4, 300.0)).unwrap();
    assert_eq!(
        left.find_different_regions(&right),
        Err(RegionError::ParamsMismatch)
    );
}

#[test]
fn test_empty_image_is_rejected() {
    let empty = tessera::Raster::new(0, 10, 3, Vec::new()).unwrap();
    assert!(matches!(
        RegionTree::build(&empty, &RegionParams::default()),
        Err(RegionError::EmptyImage { .. })
    ));
}

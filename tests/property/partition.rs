//! Region trees partition the image and rebuild deterministically

use proptest::prelude::*;
use tessera::{Raster, RegionParams, RegionTree};

/// Image made of `block`-sized tiles of pseudo-random color.
fn tiled(width: u32, height: u32, channels: u8, block: u32, seed: u64) -> Raster {
    let mut data = Vec::with_capacity((width * height) as usize * channels as usize);
    for y in 0..height {
        for x in 0..width {
            let tile = ((y / block) as u64) << 32 | (x / block) as u64;
            let mut state = (tile ^ seed).wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
            for _ in 0..channels {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                data.push((state >> 56) as u8);
            }
        }
    }
    Raster::new(width, height, channels, data).unwrap()
}

fn image_strategy() -> impl Strategy<Value = Raster> {
    (1u32..48, 1u32..48, prop::sample::select(vec![1u8, 2, 3, 4]), 1u32..12, any::<u64>())
        .prop_map(|(w, h, c, block, seed)| tiled(w, h, c, block, seed))
}

fn params_strategy() -> impl Strategy<Value = RegionParams> {
    (0u32..7, 1u32..9, 0.0f64..40.0).prop_map(|(depth, min, threshold)| RegionParams::new(depth, min, threshold))
}

#[test]
fn test_leaves_tile_the_image() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(image_strategy(), params_strategy()), |(image, params)| {
            let tree = RegionTree::build(&image, &params).unwrap();
            let mut coverage = vec![0u8; (image.width() * image.height()) as usize];

            for region in tree.leaf_regions() {
                prop_assert!(region.width > 0 && region.height > 0);
                prop_assert!(region.right() <= image.width() as u64);
                prop_assert!(region.bottom() <= image.height() as u64);
                for y in region.y..region.y + region.height {
                    for x in region.x..region.x + region.width {
                        coverage[(y * image.width() + x) as usize] += 1;
                    }
                }
            }

            // Every pixel belongs to exactly one leaf.
            prop_assert!(coverage.iter().all(|&count| count == 1));
            prop_assert!(tree.depth() <= params.max_depth);
            prop_assert_eq!(tree.leaf_hashes().len(), tree.leaf_count());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_rebuild_is_deterministic() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(image_strategy(), params_strategy()), |(image, params)| {
            let parallel = RegionTree::build(&image, &params.clone().with_parallel_depth(4)).unwrap();
            let sequential = RegionTree::build(&image, &params.clone().with_parallel_depth(0)).unwrap();
            let again = RegionTree::build(&image.clone(), &params).unwrap();

            prop_assert_eq!(parallel.root_hash(), sequential.root_hash());
            prop_assert_eq!(parallel.root_hash(), again.root_hash());
            prop_assert_eq!(parallel.leaf_regions(), sequential.leaf_regions());
            prop_assert!(parallel.find_different_regions(&again).unwrap().is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_single_pixel_edit_is_found() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(image_strategy(), params_strategy(), any::<(u32, u32)>()),
            |(image, params, (px, py))| {
                let (x, y) = (px % image.width(), py % image.height());
                let mut edited = image.clone();
                let flipped: Vec<u8> = image.pixel(x, y).iter().map(|v| v ^ 0x80).collect();
                edited.set_pixel(x, y, &flipped);

                let before = RegionTree::build(&image, &params).unwrap();
                let after = RegionTree::build(&edited, &params).unwrap();
                let regions = before.find_different_regions(&after).unwrap();

                prop_assert!(before.root_hash() != after.root_hash());
                prop_assert!(!regions.is_empty());
                prop_assert!(regions.iter().any(|r| r.contains(x, y)));
                Ok(())
            },
        )
        .unwrap();
}

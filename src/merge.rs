//! Three-way pixel merge
//!
//! Each pixel of `ours` and `theirs` is compared against `base`. A side has
//! changed a pixel when any channel moved by more than the change threshold.
//! Changes from one side are taken as-is, untouched pixels keep the base
//! value, and pixels changed on both sides are painted with the conflict
//! marker color. Gray inputs are promoted to color so the marker is visible.

use crate::error::ImageError;
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(default = "default_change_threshold")]
    pub change_threshold: u8,
    #[serde(default = "default_conflict_color")]
    pub conflict_color: [u8; 3],
}

fn default_change_threshold() -> u8 {
    10
}

fn default_conflict_color() -> [u8; 3] {
    [255, 0, 0]
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            change_threshold: default_change_threshold(),
            conflict_color: default_conflict_color(),
        }
    }
}

/// Merged image plus per-pixel bookkeeping.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub image: Raster,
    pub from_ours: usize,
    pub from_theirs: usize,
    pub conflicts: usize,
}

impl MergeOutcome {
    pub fn has_conflicts(&self) -> bool {
        self.conflicts > 0
    }
}

fn changed(base: &[u8], side: &[u8], threshold: u8) -> bool {
    base.iter()
        .zip(side)
        .any(|(&b, &s)| b.abs_diff(s) > threshold)
}

pub fn three_way_merge(
    base: &Raster,
    ours: &Raster,
    theirs: &Raster,
    config: &MergeConfig,
) -> Result<MergeOutcome, ImageError> {
    let size = (base.width(), base.height());
    for (label, image) in [("ours", ours), ("theirs", theirs)] {
        if (image.width(), image.height()) != size {
            return Err(ImageError::DimensionMismatch(format!(
                "{} is {}x{}, base is {}x{}",
                label,
                image.width(),
                image.height(),
                size.0,
                size.1
            )));
        }
    }

    let base = base.to_color();
    let ours = ours.to_color();
    let theirs = theirs.to_color();
    if ours.channels() != base.channels() || theirs.channels() != base.channels() {
        return Err(ImageError::DimensionMismatch(format!(
            "channel layouts differ: base {}, ours {}, theirs {}",
            base.channels(),
            ours.channels(),
            theirs.channels()
        )));
    }

    let mut marker = config.conflict_color.to_vec();
    if base.channels() == 4 {
        marker.push(u8::MAX);
    }

    let mut merged = base.clone();
    let (mut from_ours, mut from_theirs, mut conflicts) = (0usize, 0usize, 0usize);
    for y in 0..size.1 {
        for x in 0..size.0 {
            let b = base.pixel(x, y);
            let o = ours.pixel(x, y);
            let t = theirs.pixel(x, y);
            match (
                changed(b, o, config.change_threshold),
                changed(b, t, config.change_threshold),
            ) {
                (true, true) => {
                    merged.set_pixel(x, y, &marker);
                    conflicts += 1;
                }
                (true, false) => {
                    merged.set_pixel(x, y, o);
                    from_ours += 1;
                }
                (false, true) => {
                    merged.set_pixel(x, y, t);
                    from_theirs += 1;
                }
                (false, false) => {}
            }
        }
    }

    Ok(MergeOutcome {
        image: merged,
        from_ours,
        from_theirs,
        conflicts,
    })
}

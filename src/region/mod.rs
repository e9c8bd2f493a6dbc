//! Region Quadtree
//!
//! Partitions an image into homogeneous rectangular chunks. Every node of the
//! resulting tree carries a content hash, so identical subtrees in two images
//! hash identically and comparisons can prune them without touching pixels.

pub mod stats;
pub mod tree;

pub use tree::{RegionNode, RegionTree};

use crate::error::RegionError;
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle inside an image's pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Position of a child inside its parent region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    /// Fixed hashing and traversal order.
    pub const ORDER: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    pub fn index(self) -> usize {
        match self {
            Quadrant::TopLeft => 0,
            Quadrant::TopRight => 1,
            Quadrant::BottomLeft => 2,
            Quadrant::BottomRight => 3,
        }
    }
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The region covering a whole image.
    pub fn full(raster: &Raster) -> Self {
        Self::new(0, 0, raster.width(), raster.height())
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Check that the region is non-empty and lies inside a `width` x `height` grid.
    pub fn validate_within(&self, width: u32, height: u32) -> Result<(), RegionError> {
        if self.width == 0
            || self.height == 0
            || self.right() > width as u64
            || self.bottom() > height as u64
        {
            return Err(RegionError::InvalidRegion {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width: width,
                image_height: height,
            });
        }
        Ok(())
    }

    /// Split into four quadrants in `Quadrant::ORDER`.
    ///
    /// The left/top halves get `floor(dim / 2)`; the remainder goes to the
    /// right/bottom quadrants so the four children tile the parent exactly.
    pub fn split(&self) -> [Region; 4] {
        let half_w = self.width / 2;
        let half_h = self.height / 2;
        let rest_w = self.width - half_w;
        let rest_h = self.height - half_h;
        [
            Region::new(self.x, self.y, half_w, half_h),
            Region::new(self.x + half_w, self.y, rest_w, half_h),
            Region::new(self.x, self.y + half_h, half_w, rest_h),
            Region::new(self.x + half_w, self.y + half_h, rest_w, rest_h),
        ]
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && (x as u64) < self.right() && y >= self.y && (y as u64) < self.bottom()
    }

    pub fn intersects(&self, other: &Region) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }
}

/// Parameters controlling how far a region tree subdivides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionParams {
    /// Nodes at this depth are always leaves.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Regions whose width or height is at or below this size are leaves.
    #[serde(default = "default_min_size")]
    pub min_size: u32,

    /// Per-channel standard deviation below which a region is homogeneous.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Subtrees above this depth are built as parallel tasks; 0 disables it.
    /// Does not affect the resulting tree.
    #[serde(default = "default_parallel_depth")]
    pub parallel_depth: u32,
}

fn default_max_depth() -> u32 {
    8
}

fn default_min_size() -> u32 {
    8
}

fn default_threshold() -> f64 {
    10.0
}

fn default_parallel_depth() -> u32 {
    2
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_size: default_min_size(),
            threshold: default_threshold(),
            parallel_depth: default_parallel_depth(),
        }
    }
}

impl RegionParams {
    pub fn new(max_depth: u32, min_size: u32, threshold: f64) -> Self {
        Self {
            max_depth,
            min_size,
            threshold,
            ..Self::default()
        }
    }

    pub fn with_parallel_depth(mut self, parallel_depth: u32) -> Self {
        self.parallel_depth = parallel_depth;
        self
    }

    pub fn validate(&self) -> Result<(), RegionError> {
        if self.min_size == 0 {
            return Err(RegionError::InvalidParams("min_size must be at least 1".to_string()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(RegionError::InvalidParams(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Whether two parameter sets produce the same tree for the same image.
    pub fn same_shape_as(&self, other: &RegionParams) -> bool {
        self.max_depth == other.max_depth
            && self.min_size == other.min_size
            && self.threshold.to_bits() == other.threshold.to_bits()
    }

    /// Stable textual form, used in cache keys.
    pub fn cache_fragment(&self) -> String {
        format!("d{}_m{}_t{}", self.max_depth, self.min_size, self.threshold)
    }
}

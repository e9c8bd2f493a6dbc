//! Pixel statistics for homogeneity decisions

use crate::raster::Raster;
use crate::region::Region;

/// Population standard deviation of each channel inside `region`.
///
/// The region must already be validated against the raster bounds.
pub fn channel_stddev(raster: &Raster, region: &Region) -> Vec<f64> {
    let channels = raster.channels() as usize;
    let mut sums = vec![0u64; channels];
    let mut squares = vec![0u64; channels];

    for y in region.y..region.y + region.height {
        let row = raster.row_span(region.x, y, region.width);
        for px in row.chunks_exact(channels) {
            for (c, value) in px.iter().enumerate() {
                let v = *value as u64;
                sums[c] += v;
                squares[c] += v * v;
            }
        }
    }

    let n = region.area() as f64;
    sums.iter()
        .zip(squares.iter())
        .map(|(&sum, &sq)| {
            let mean = sum as f64 / n;
            let variance = (sq as f64 / n - mean * mean).max(0.0);
            variance.sqrt()
        })
        .collect()
}

/// A region is homogeneous when every channel's deviation is below `threshold`.
pub fn is_homogeneous(raster: &Raster, region: &Region, threshold: f64) -> bool {
    channel_stddev(raster, region)
        .into_iter()
        .all(|deviation| deviation < threshold)
}

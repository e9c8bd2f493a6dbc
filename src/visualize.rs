//! Rendering helpers for comparisons and region trees

use crate::raster::Raster;
use crate::region::{Region, RegionTree};

pub const DIFF_COLOR: [u8; 3] = [255, 0, 0];
pub const OUTLINE_COLOR: [u8; 3] = [0, 255, 0];

const DIFF_THICKNESS: u32 = 2;
const OUTLINE_THICKNESS: u32 = 1;

/// Draw a rectangle border of `thickness` pixels inside each region.
///
/// Returns a color copy of `raster`; regions are clipped to the image.
pub fn outline_regions(raster: &Raster, regions: &[Region], color: [u8; 3], thickness: u32) -> Raster {
    let mut canvas = raster.to_color();
    let mut pixel = color.to_vec();
    if canvas.channels() == 4 {
        pixel.push(u8::MAX);
    }

    let (width, height) = (canvas.width(), canvas.height());
    for region in regions {
        let x0 = region.x.min(width);
        let y0 = region.y.min(height);
        let x1 = (region.right().min(width as u64)) as u32;
        let y1 = (region.bottom().min(height as u64)) as u32;
        if x0 >= x1 || y0 >= y1 {
            continue;
        }
        let band = thickness.max(1);
        for y in y0..y1 {
            for x in x0..x1 {
                let on_border = x < x0 + band || x + band >= x1 || y < y0 + band || y + band >= y1;
                if on_border {
                    canvas.set_pixel(x, y, &pixel);
                }
            }
        }
    }
    canvas
}

/// Mark differing regions in red.
pub fn highlight_differences(raster: &Raster, regions: &[Region]) -> Raster {
    outline_regions(raster, regions, DIFF_COLOR, DIFF_THICKNESS)
}

/// Draw every leaf of the region tree in green.
pub fn draw_region_tree(raster: &Raster, tree: &RegionTree) -> Raster {
    outline_regions(raster, &tree.leaf_regions(), OUTLINE_COLOR, OUTLINE_THICKNESS)
}

//! Shared fixtures for integration tests

use tempfile::TempDir;
use tessera::{Raster, Repository, TesseraConfig};

/// Repository in a fresh temp dir with small region parameters.
pub fn temp_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().unwrap();
    Repository::init(temp_dir.path()).unwrap();
    let repo = Repository::open_with_config(temp_dir.path(), small_config()).unwrap();
    (temp_dir, repo)
}

pub fn small_config() -> TesseraConfig {
    let mut config = TesseraConfig::default();
    config.region.max_depth = 5;
    config.region.min_size = 4;
    config
}

pub fn flat(width: u32, height: u32, shade: u8) -> Raster {
    Raster::filled(width, height, &[shade, shade, shade]).unwrap()
}

/// Deterministic high-variance RGB image.
pub fn noise(width: u32, height: u32, seed: u32) -> Raster {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    for _ in 0..width * height * 3 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        data.push((state >> 24) as u8);
    }
    Raster::new(width, height, 3, data).unwrap()
}

/// Fill a rectangle with a solid color.
pub fn paint(image: &mut Raster, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
    for py in y..y + h {
        for px in x..x + w {
            image.set_pixel(px, py, &color);
        }
    }
}

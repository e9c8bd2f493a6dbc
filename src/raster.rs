//! Raster pixel buffers
//!
//! An 8-bit, row-major, channel-interleaved pixel buffer plus lossless PNG
//! decoding and encoding through the `image` crate.

use crate::error::ImageError;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::fs;
use std::path::Path;

/// In-memory 8-bit image.
///
/// Supported layouts: 1 (gray), 2 (gray + alpha), 3 (RGB), 4 (RGBA) channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap an existing pixel buffer, validating its length.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, ImageError> {
        if !(1..=4).contains(&channels) {
            return Err(ImageError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(ImageError::BufferLength {
                width,
                height,
                channels,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Create an image where every pixel has the given value.
    ///
    /// `pixel.len()` determines the channel count.
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Result<Self, ImageError> {
        let channels = u8::try_from(pixel.len())
            .map_err(|_| ImageError::UnsupportedChannels(u8::MAX))?;
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(pixel);
        }
        Self::new(width, height, channels, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether two rasters share width, height and channel layout.
    pub fn same_shape(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels as usize
    }

    /// Channel values of one pixel. Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + self.channels as usize]
    }

    /// Overwrite one pixel. Panics if out of bounds or `value` has the wrong length.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: &[u8]) {
        let start = self.offset(x, y);
        let channels = self.channels as usize;
        self.data[start..start + channels].copy_from_slice(value);
    }

    /// Bytes of `width` consecutive pixels on row `y`, starting at column `x`.
    pub fn row_span(&self, x: u32, y: u32, width: u32) -> &[u8] {
        let start = self.offset(x, y);
        &self.data[start..start + width as usize * self.channels as usize]
    }

    /// Promote gray layouts to their color equivalents (1 -> 3, 2 -> 4).
    ///
    /// Color layouts are returned unchanged.
    pub fn to_color(&self) -> Raster {
        let target = match self.channels {
            1 => 3,
            2 => 4,
            _ => return self.clone(),
        };
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * target);
        for px in self.data.chunks_exact(self.channels as usize) {
            data.extend_from_slice(&[px[0], px[0], px[0]]);
            if target == 4 {
                data.push(px[1]);
            }
        }
        Raster {
            width: self.width,
            height: self.height,
            channels: target as u8,
            data,
        }
    }

    /// Nearest-neighbour resample to `width` x `height`.
    pub fn downsample(&self, width: u32, height: u32) -> Raster {
        if self.is_empty() || width == 0 || height == 0 {
            return Raster {
                width: 0,
                height: 0,
                channels: self.channels,
                data: Vec::new(),
            };
        }
        let mut data = Vec::with_capacity(width as usize * height as usize * self.channels as usize);
        for y in 0..height {
            let src_y = (y as u64 * self.height as u64 / height as u64) as u32;
            for x in 0..width {
                let src_x = (x as u64 * self.width as u64 / width as u64) as u32;
                data.extend_from_slice(self.pixel(src_x, src_y));
            }
        }
        Raster {
            width,
            height,
            channels: self.channels,
            data,
        }
    }

    /// Decode any format supported by the `image` crate.
    ///
    /// 8-bit gray, gray-alpha, RGB and RGBA are kept exactly; other pixel
    /// formats are converted to RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        let (channels, data) = match decoded {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };
        Self::new(width, height, channels, data)
    }

    /// Encode as PNG (lossless).
    pub fn encode_png(&self) -> Result<Vec<u8>, ImageError> {
        let color = match self.channels {
            1 => ExtendedColorType::L8,
            2 => ExtendedColorType::La8,
            3 => ExtendedColorType::Rgb8,
            4 => ExtendedColorType::Rgba8,
            other => return Err(ImageError::UnsupportedChannels(other)),
        };
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(&self.data, self.width, self.height, color)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Ok(out)
    }

    /// Load an image file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let bytes = fs::read(path.as_ref())?;
        Self::decode(&bytes)
    }

    /// Save as PNG, regardless of the path's extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        let encoded = self.encode_png()?;
        fs::write(path.as_ref(), encoded)?;
        Ok(())
    }
}

//! Rasterized tile content.

use bytes::Bytes;
use image::RgbaImage;

/// Bytes per RGBA8 pixel.
const BYTES_PER_PIXEL: usize = 4;

/// An immutable block of RGBA8 pixels.
///
/// Cloning is cheap: pixel data is reference counted, so the cache can hand
/// the same tile to any number of draws while producers keep inserting.
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
    width: u32,
    height: u32,
    data: Bytes,
}

impl TileImage {
    /// Wrap raw RGBA8 data; returns `None` if the length does not match.
    pub fn from_rgba(width: u32, height: u32, data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        if data.len() != width as usize * height as usize * BYTES_PER_PIXEL {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A tile filled with a single colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let data: Vec<u8> = rgba.iter().copied().cycle().take(pixels * BYTES_PER_PIXEL).collect();
        Self {
            width,
            height,
            data: Bytes::from(data),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the pixel data in bytes, used for cache accounting.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Raw RGBA8 pixel data, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(x, y)`, clamped to the image bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if self.width == 0 || self.height == 0 {
            return [0; 4];
        }
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let offset = (y * self.width as usize + x) * BYTES_PER_PIXEL;
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[offset..offset + BYTES_PER_PIXEL]);
        px
    }
}

impl From<RgbaImage> for TileImage {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Bytes::from(image.into_raw()),
        }
    }
}

impl std::fmt::Debug for TileImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

//! Captured frames, GPU handles and decoded images.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque handle to a backend texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Opaque handle to a backend shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramHandle(pub u32);

/// A decoded video frame uploaded into a pooled texture.
///
/// Deliberately not `Clone`: a texture handle lives in exactly one slot
/// at a time and goes back to the pool only from there.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    /// Texture holding the pixels.
    pub texture: TextureHandle,
    /// Capture order, strictly increasing per capture unit.
    pub sequence: u64,
    /// Host clock at capture.
    pub captured_at: Timestamp,
    /// Display refresh index at capture.
    pub refresh: u64,
}

/// Pixel layout of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA
    #[default]
    Rgba8,
    /// 8-bit BGRA (common platform decoder output)
    Bgra8,
}

impl PixelFormat {
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        4
    }
}

/// The media element's current decoded picture in CPU memory.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row (may include padding)
    pub stride: usize,
    pub data: Vec<u8>,
}

impl DecodedImage {
    /// Create a black image. Rows are padded to 64 bytes.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let min_stride = width as usize * format.bytes_per_pixel();
        let stride = (min_stride + 63) & !63;
        Self {
            format,
            width,
            height,
            stride,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// Image filled with one RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut image = Self::new(width, height, PixelFormat::Rgba8);
        for y in 0..height {
            for px in image.row_mut(y).chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
        image
    }

    /// Moving color bars; `phase` shifts the bars so consecutive frames differ.
    pub fn test_pattern(width: u32, height: u32, phase: u32) -> Self {
        const BARS: [[u8; 4]; 8] = [
            [255, 255, 255, 255],
            [255, 255, 0, 255],
            [0, 255, 255, 255],
            [0, 255, 0, 255],
            [255, 0, 255, 255],
            [255, 0, 0, 255],
            [0, 0, 255, 255],
            [0, 0, 0, 255],
        ];
        let mut image = Self::new(width, height, PixelFormat::Rgba8);
        let width = width.max(1);
        for y in 0..height {
            let row = image.row_mut(y);
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let shifted = (x as u32 + phase) % width;
                px.copy_from_slice(&BARS[(shifted * 8 / width) as usize]);
            }
        }
        image
    }

    /// Tightly packed bytes of one row.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.format.bytes_per_pixel()]
    }

    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.width as usize * self.format.bytes_per_pixel();
        &mut self.data[start..start + len]
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Decoded image shared between the host and the capture unit.
pub type SharedImage = Arc<DecodedImage>;

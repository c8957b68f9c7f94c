//! Image loading and scanline extraction
//!
//! The device wants one byte per pixel, 0 = laser off, 255 = full burn.
//! Source images are the other way around (dark pixels should burn), so
//! every sample is inverted after the grayscale conversion.

use std::path::Path;

use tracing::debug;

use crate::error::SenderError;

/// Scanline buffer capacity of the device
pub const DEVICE_MAX_WIDTH: u32 = 1024;

/// A rasterized image, one intensity byte per pixel
pub struct ScanlineImage {
    width: u16,
    height: u16,
    rows: Vec<Vec<u8>>,
}

impl ScanlineImage {
    /// Load an image file, convert to grayscale, and invert
    pub fn load(path: &Path) -> Result<Self, SenderError> {
        let buffer = image::open(path)?.to_luma8();
        let (width, height) = buffer.dimensions();
        debug!("loaded {}: {}x{} px", path.display(), width, height);

        if width > DEVICE_MAX_WIDTH {
            return Err(SenderError::ImageTooWide {
                width,
                limit: DEVICE_MAX_WIDTH,
            });
        }
        if width == 0 || height == 0 || height > u32::from(u16::MAX) {
            return Err(SenderError::ImageTooLarge { width, height });
        }

        let rows = (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| 255 - buffer.get_pixel(x, y).0[0])
                    .collect()
            })
            .collect();

        Ok(Self {
            width: width as u16,
            height: height as u16,
            rows,
        })
    }

    /// Scanline width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Number of scanlines
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Iterate over scanlines, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
impl ScanlineImage {
    /// Build directly from intensity rows
    pub(crate) fn from_rows(rows: Vec<Vec<u8>>) -> Self {
        Self {
            width: rows[0].len() as u16,
            height: rows.len() as u16,
            rows,
        }
    }
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Read-back of a rendered frame.

use crate::pixel_formats::png_support;
use crate::pixel_formats::{RGBA8UNorm, Unorm4, as_bytes};
use std::collections::HashSet;
use std::path::Path;

/// A captured RGBA8 frame, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCapture {
    width: u32,
    height: u32,
    pixels: Vec<Unorm4>,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("Can't write capture {0}")]
    Io(#[from] std::io::Error),
    #[error("Can't encode capture {0}")]
    Png(#[from] png::EncodingError),
}

impl FrameCapture {
    /// # Panics
    ///
    /// Panics if `pixels` does not hold exactly `width * height` entries.
    pub fn new(width: u32, height: u32, pixels: Vec<Unorm4>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "capture of {width}x{height} needs {} pixels",
            width as usize * height as usize
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Unorm4] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Unorm4 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// The pixel under a normalized device coordinate (`y` up).
    pub fn pixel_at_ndc(&self, x: f32, y: f32) -> Unorm4 {
        let px = ((x + 1.0) * 0.5 * self.width as f32).floor();
        let py = ((1.0 - y) * 0.5 * self.height as f32).floor();
        let px = px.clamp(0.0, self.width as f32 - 1.0) as u32;
        let py = py.clamp(0.0, self.height as f32 - 1.0) as u32;
        self.pixel(px, py)
    }

    /// Every distinct color in the frame.
    pub fn distinct_colors(&self) -> HashSet<Unorm4> {
        self.pixels.iter().copied().collect()
    }

    pub fn encode_png<W: std::io::Write>(&self, writer: W) -> Result<(), CaptureError> {
        png_support::encode::<RGBA8UNorm, _>(
            writer,
            self.width,
            self.height,
            as_bytes(&self.pixels),
        )?;
        Ok(())
    }

    pub fn write_png(&self, path: impl AsRef<Path>) -> Result<(), CaptureError> {
        let file = std::fs::File::create(path)?;
        self.encode_png(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_lookup_flips_y() {
        let top = Unorm4 { r: 1, g: 0, b: 0, a: 255 };
        let bottom = Unorm4 { r: 2, g: 0, b: 0, a: 255 };
        let capture = FrameCapture::new(1, 2, vec![top, bottom]);
        assert_eq!(capture.pixel_at_ndc(0.0, 0.5), top);
        assert_eq!(capture.pixel_at_ndc(0.0, -0.5), bottom);
        assert_eq!(capture.distinct_colors().len(), 2);
    }

    #[test]
    fn encodes_png() {
        let capture = FrameCapture::new(2, 2, vec![Unorm4::default(); 4]);
        let mut out = Vec::new();
        capture.encode_png(&mut out).unwrap();
        assert_eq!(&out[1..4], b"PNG");
    }
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Type-safe texel format definitions for bindless textures.
//!
//! Each pixel format is a zero-sized type that encodes
//!
//! - the number of channels,
//! - the per-channel storage,
//! - the C-compatible pixel struct you write when uploading content.
//!
//! # Available Formats
//!
//! - [`RGBA8UNorm`] - 4-channel 8-bit normalized (4 bytes total)
//! - [`R8UNorm`] - 8-bit normalized single channel (1 byte total)
//!
//! # Examples
//!
//! ```
//! use bindless_multidraw::pixel_formats::{RGBA8UNorm, Unorm4};
//!
//! // The color of grid cell (1, 2)
//! let pixel = Unorm4 { r: 31, g: 63, b: 128, a: 255 };
//! ```

/*
Formats are types rather than an enum so that `TextureAllocator::allocate::<F>` can typecheck
the pixel slice you hand it.  Backends only need the runtime tag, which is `TexelFormat`.
 */
pub(crate) mod png_support;

use crate::pixel_formats::sealed::{PixelFormat, ReprC};
use std::fmt::Debug;

/// Sealed traits for pixel format type safety.
///
/// Only the formats defined in this crate can be used with the allocator.
pub(crate) mod sealed {
    use std::fmt::Debug;

    /// Core trait for pixel format types.
    pub trait PixelFormat: std::fmt::Debug + Send + Sync + 'static {
        /// Number of bytes per pixel for this format.
        const BYTES_PER_PIXEL: u8;
        /// Runtime tag handed to backends.
        const TEXEL_FORMAT: super::TexelFormat;

        /// The concrete pixel type with guaranteed C-compatible memory layout.
        type CPixel: Clone + Debug + Send + ReprC;
    }

    /// Marker trait indicating C-compatible memory layout.
    ///
    /// Types implementing this trait have predictable memory layout with:
    /// - No padding between fields
    /// - No uninitialized bytes
    /// - Stable field ordering
    ///
    /// # Safety
    ///
    /// This trait is unsafe to implement because incorrect implementation
    /// could lead to undefined behavior when casting to byte slices.
    pub unsafe trait ReprC {}
}

/// View a slice of C-compatible records as raw bytes.
///
/// Used for pixel content as well as the instance tables, vertices and draw descriptors,
/// all of which are uploaded byte-for-byte.
pub(crate) fn as_bytes<T: ReprC>(t: &[T]) -> &[u8] {
    //safe because we know that T is repr(C)
    //(we offloaded the safety check to the ReprC trait)
    unsafe { std::slice::from_raw_parts(t.as_ptr() as *const u8, std::mem::size_of_val(t)) }
}

/// Runtime description of a texel format, as seen by backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TexelFormat {
    /// 4 channels, 8-bit normalized, linear.
    Rgba8Unorm,
    /// 1 channel, 8-bit normalized.
    R8Unorm,
}

impl TexelFormat {
    pub const fn bytes_per_texel(self) -> u8 {
        match self {
            TexelFormat::Rgba8Unorm => 4,
            TexelFormat::R8Unorm => 1,
        }
    }

    /// Decodes the texel at the start of `bytes` into normalized RGBA.
    ///
    /// Single-channel formats expand to `(r, 0, 0, 1)` the way GPU samplers do.
    pub(crate) fn decode(self, bytes: &[u8]) -> Float4 {
        match self {
            TexelFormat::Rgba8Unorm => Unorm4 {
                r: bytes[0],
                g: bytes[1],
                b: bytes[2],
                a: bytes[3],
            }
            .into(),
            TexelFormat::R8Unorm => Float4 {
                r: bytes[0] as f32 / 255.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
        }
    }
}

/// 8-bit normalized unsigned integer format with a single red channel.
///
/// Values are stored as 0-255 and interpreted as 0.0-1.0 when sampled.
///
/// ```
/// use bindless_multidraw::pixel_formats::R8UNorm;
///
/// // The pixel type for R8UNorm is u8
/// let pixel: u8 = 128;
/// ```
#[derive(Debug, Clone)]
pub struct R8UNorm;
impl PixelFormat for R8UNorm {
    const BYTES_PER_PIXEL: u8 = 1;
    const TEXEL_FORMAT: TexelFormat = TexelFormat::R8Unorm;
    type CPixel = u8;
}

unsafe impl ReprC for u8 {}

/// 8-bit normalized RGBA pixel.
///
/// This is the pixel type for [`RGBA8UNorm`]. Values range from 0-255
/// and map to 0.0-1.0 when sampled.
///
/// ```
/// use bindless_multidraw::pixel_formats::{Unorm4, Float4};
///
/// let opaque_red = Unorm4 { r: 255, g: 0, b: 0, a: 255 };
/// let unorm_color = Unorm4::from_floats(Float4 { r: 1.0, g: 0.5, b: 0.0, a: 1.0 });
/// assert_eq!(unorm_color.g, 128);
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unorm4 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
unsafe impl ReprC for Unorm4 {}

impl Unorm4 {
    /// Convert from normalized float values (0.0-1.0) to 8-bit values (0-255).
    ///
    /// Values are clamped to the valid range and rounded to nearest integer.
    pub fn from_floats(float4: Float4) -> Self {
        Unorm4 {
            r: (float4.r * 255.0).round().clamp(0.0, 255.0) as u8,
            g: (float4.g * 255.0).round().clamp(0.0, 255.0) as u8,
            b: (float4.b * 255.0).round().clamp(0.0, 255.0) as u8,
            a: (float4.a * 255.0).round().clamp(0.0, 255.0) as u8,
        }
    }
}

/// 8-bit normalized unsigned integer format with RGBA channels.
///
/// The format used by the grid scene's 1x1 instance textures and by captured frames.
#[derive(Debug, Clone)]
pub struct RGBA8UNorm;
impl PixelFormat for RGBA8UNorm {
    const BYTES_PER_PIXEL: u8 = 4;
    const TEXEL_FORMAT: TexelFormat = TexelFormat::Rgba8Unorm;
    type CPixel = Unorm4;
}

/// Normalized floating-point RGBA color.
///
/// Used for clear colors and for filtering math in the software backend.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Float4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}
unsafe impl ReprC for Float4 {}

impl Float4 {
    pub(crate) fn lerp(self, other: Float4, t: f32) -> Float4 {
        Float4 {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl From<Unorm4> for Float4 {
    fn from(val: Unorm4) -> Self {
        Float4 {
            r: val.r as f32 / 255.0,
            g: val.g as f32 / 255.0,
            b: val.b as f32 / 255.0,
            a: val.a as f32 / 255.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unorm_float_roundtrip_is_exact() {
        for v in [0u8, 1, 31, 127, 128, 223, 255] {
            let p = Unorm4 { r: v, g: v, b: v, a: v };
            assert_eq!(Unorm4::from_floats(p.into()), p);
        }
    }

    #[test]
    fn bytes_view_is_tightly_packed() {
        let pixels = [
            Unorm4 { r: 1, g: 2, b: 3, a: 4 },
            Unorm4 { r: 5, g: 6, b: 7, a: 8 },
        ];
        assert_eq!(as_bytes(&pixels), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(
            RGBA8UNorm::BYTES_PER_PIXEL,
            TexelFormat::Rgba8Unorm.bytes_per_texel()
        );
        assert_eq!(R8UNorm::BYTES_PER_PIXEL, TexelFormat::R8Unorm.bytes_per_texel());
    }

    #[test]
    fn r8_decodes_like_a_sampler() {
        let c = TexelFormat::R8Unorm.decode(&[255]);
        assert_eq!(c, Float4 { r: 1.0, g: 0.0, b: 0.0, a: 1.0 });
    }
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The texture resource allocator.

Creates one texture per draw instance, uploads its content, and makes it resident so that
shaders can sample it through a [`BindlessHandle`] without a bind call.

Residency is a one-way transition for the lifetime of a run.  The only way back is
[`TextureAllocator::release_all`], which the running port calls at shutdown.

```
use bindless_multidraw::bindings::texture_allocator::{TextureAllocator, TextureDescriptor};
use bindless_multidraw::imp::software::SoftwareBackend;
use bindless_multidraw::pixel_formats::{RGBA8UNorm, Unorm4};

let mut backend = SoftwareBackend::new();
let mut allocator = TextureAllocator::new();
let handle = allocator
    .allocate::<RGBA8UNorm, _>(
        &mut backend,
        &TextureDescriptor::default(),
        &[Unorm4 { r: 255, g: 0, b: 0, a: 255 }],
    )
    .unwrap();
assert_eq!(allocator.handles().next(), Some(handle));
```
*/

use crate::bindings::handle_table::BindlessHandle;
use crate::bindings::sampler::SamplerDescriptor;
use crate::imp::{self, Backend, TextureId};
use crate::pixel_formats::sealed::PixelFormat;
use crate::pixel_formats::{TexelFormat, as_bytes};

/// Shape, format and sampling state of one texture.
///
/// The default is a 1x1 RGBA8 texture sampled with repeat + linear.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: TexelFormat,
    pub sampler: SamplerDescriptor,
    pub debug_name: &'static str,
}

impl TextureDescriptor {
    pub fn new(width: u32, height: u32, format: TexelFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..Default::default()
        }
    }

    pub fn with_sampler(mut self, sampler: SamplerDescriptor) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_debug_name(mut self, debug_name: &'static str) -> Self {
        self.debug_name = debug_name;
        self
    }

    /// Number of content bytes this texture requires.
    pub fn content_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_texel() as usize
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            format: TexelFormat::Rgba8Unorm,
            sampler: SamplerDescriptor::default(),
            debug_name: "bindless texture",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Texture content is {actual} bytes but {width}x{height} texels need {expected}")]
    ContentSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Texture dimensions {width}x{height} are empty")]
    ZeroSize { width: u32, height: u32 },
    #[error("{bytes_per_texel} bytes per texel does not match format {format:?}")]
    TexelSize {
        format: TexelFormat,
        bytes_per_texel: u8,
    },
    #[error("Backend error {0}")]
    Backend(#[from] imp::Error),
}

#[derive(Debug, Clone)]
struct Allocation {
    texture: TextureId,
    handle: BindlessHandle,
}

/// Owns every texture it creates, in allocation order.
#[derive(Debug, Default)]
pub struct TextureAllocator {
    allocations: Vec<Allocation>,
}

impl TextureAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a texture from typed pixels, makes it resident and returns its handle.
    pub fn allocate<Format: PixelFormat, B: Backend>(
        &mut self,
        backend: &mut B,
        descriptor: &TextureDescriptor,
        pixels: &[Format::CPixel],
    ) -> Result<BindlessHandle, Error> {
        if descriptor.format != Format::TEXEL_FORMAT {
            return Err(Error::TexelSize {
                format: descriptor.format,
                bytes_per_texel: Format::BYTES_PER_PIXEL,
            });
        }
        self.allocate_bytes(backend, descriptor, Format::BYTES_PER_PIXEL, as_bytes(pixels))
    }

    /**
    Creates a texture from raw bytes, makes it resident and returns its handle.

    `content` must be exactly `width * height * bytes_per_texel` bytes, and `bytes_per_texel`
    must agree with the descriptor's format.
    */
    pub fn allocate_bytes<B: Backend>(
        &mut self,
        backend: &mut B,
        descriptor: &TextureDescriptor,
        bytes_per_texel: u8,
        content: &[u8],
    ) -> Result<BindlessHandle, Error> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(Error::ZeroSize {
                width: descriptor.width,
                height: descriptor.height,
            });
        }
        if bytes_per_texel != descriptor.format.bytes_per_texel() {
            return Err(Error::TexelSize {
                format: descriptor.format,
                bytes_per_texel,
            });
        }
        let expected = descriptor.content_len();
        if content.len() != expected {
            return Err(Error::ContentSize {
                width: descriptor.width,
                height: descriptor.height,
                expected,
                actual: content.len(),
            });
        }
        let texture = backend.create_texture(descriptor, content)?;
        let handle = backend.make_texture_resident(texture)?;
        logwise::trace_sync!(
            "allocated texture {index} as {handle}",
            index = self.allocations.len(),
            handle = logwise::privacy::LogIt(&handle)
        );
        self.allocations.push(Allocation { texture, handle });
        Ok(handle)
    }

    /// Makes an already-created texture resident.  Idempotent.
    pub fn make_resident<B: Backend>(
        &mut self,
        backend: &mut B,
        texture: TextureId,
    ) -> Result<BindlessHandle, Error> {
        let handle = backend.make_texture_resident(texture)?;
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Handles in allocation order.
    pub fn handles(&self) -> impl Iterator<Item = BindlessHandle> + '_ {
        self.allocations.iter().map(|a| a.handle)
    }

    /// Textures in allocation order.
    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.allocations.iter().map(|a| a.texture)
    }

    /// Releases residency and destroys every texture this allocator created.
    ///
    /// Every texture is attempted; the first error is returned.
    pub fn release_all<B: Backend>(&mut self, backend: &mut B) -> Result<(), Error> {
        let mut first_error = None;
        for allocation in self.allocations.drain(..) {
            if let Err(e) = backend.release_texture(allocation.texture) {
                logwise::warn_sync!(
                    "failed to release texture: {err}",
                    err = logwise::privacy::LogIt(&e)
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::software::SoftwareBackend;
    use crate::pixel_formats::{R8UNorm, RGBA8UNorm, Unorm4};

    #[test]
    fn content_size_must_match() {
        let mut backend = SoftwareBackend::new();
        let mut allocator = TextureAllocator::new();
        let descriptor = TextureDescriptor::new(2, 2, TexelFormat::Rgba8Unorm);
        let err = allocator
            .allocate_bytes(&mut backend, &descriptor, 4, &[0; 12])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ContentSize {
                expected: 16,
                actual: 12,
                ..
            }
        ));
        assert!(allocator.is_empty());
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut backend = SoftwareBackend::new();
        let mut allocator = TextureAllocator::new();
        let descriptor = TextureDescriptor::new(0, 1, TexelFormat::Rgba8Unorm);
        let err = allocator
            .allocate_bytes(&mut backend, &descriptor, 4, &[])
            .unwrap_err();
        assert!(matches!(err, Error::ZeroSize { .. }));
    }

    #[test]
    fn typed_format_must_match_descriptor() {
        let mut backend = SoftwareBackend::new();
        let mut allocator = TextureAllocator::new();
        let err = allocator
            .allocate::<R8UNorm, _>(&mut backend, &TextureDescriptor::default(), &[1u8])
            .unwrap_err();
        assert!(matches!(err, Error::TexelSize { .. }));
    }

    #[test]
    fn make_resident_is_idempotent() {
        let mut backend = SoftwareBackend::new();
        let mut allocator = TextureAllocator::new();
        let handle = allocator
            .allocate::<RGBA8UNorm, _>(
                &mut backend,
                &TextureDescriptor::default(),
                &[Unorm4 { r: 1, g: 2, b: 3, a: 4 }],
            )
            .unwrap();
        let texture = allocator.textures().next().unwrap();
        assert_eq!(allocator.make_resident(&mut backend, texture).unwrap(), handle);
        assert_eq!(allocator.make_resident(&mut backend, texture).unwrap(), handle);
        assert!(backend.is_resident(handle));
    }

    #[test]
    fn release_all_revokes_residency() {
        let mut backend = SoftwareBackend::new();
        let mut allocator = TextureAllocator::new();
        let handle = allocator
            .allocate::<RGBA8UNorm, _>(
                &mut backend,
                &TextureDescriptor::default(),
                &[Unorm4::default()],
            )
            .unwrap();
        allocator.release_all(&mut backend).unwrap();
        assert!(allocator.is_empty());
        assert!(!backend.is_resident(handle));
        assert_eq!(backend.texture_count(), 0);
    }
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The graphics backend seam.

Everything above this module speaks in terms of [`Backend`]: create fixed-size textures and
buffers, make a texture resident to obtain its bindless handle, link the one program, bind
everything once, then clear / multidraw / present every frame.

Two implementations ship:

* [`software::SoftwareBackend`], always available.  A deterministic CPU rasterizer that
  records every submitted draw and treats sampling a non-resident handle as a programming
  error.
* `wgpu::WgpuBackend`, behind the `backend_wgpu` feature (on by default).  Residency is
  membership in a texture binding array bound once before the first frame.
*/

use crate::bindings::BindStyle;
use crate::bindings::handle_table::BindlessHandle;
use crate::bindings::texture_allocator::TextureDescriptor;
use crate::bindings::visible_to::GPUBufferUsage;
use crate::images::frame::FrameCapture;
use crate::images::shader::ProgramDescriptor;
use crate::pixel_formats::Float4;

pub mod software;

#[cfg(feature = "backend_wgpu")]
pub mod wgpu;

/// Backend-assigned identity of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

/// Backend-assigned identity of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub(crate) u32);

/// Backend-assigned identity of a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

/// Size of a backend's render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

/**
A graphics backend able to run the bindless multidraw pipeline.

Resources are immutable once created: there is no resize and no partial update.  A backend is
owned by exactly one thread and driven through `&mut self`.
*/
pub trait Backend {
    /// Human-readable backend name, for logs.
    fn name(&self) -> &'static str;

    /// Size of the render target in pixels.
    fn target_size(&self) -> (u32, u32);

    /// Creates a texture and uploads `content`, which is tightly packed rows of texels.
    ///
    /// Callers have already validated `content.len()` against the descriptor.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        content: &[u8],
    ) -> Result<TextureId, Error>;

    /// Makes a texture resident for bindless sampling and returns its handle.
    ///
    /// Idempotent: a second call for the same texture returns the identical handle.
    fn make_texture_resident(&mut self, texture: TextureId) -> Result<BindlessHandle, Error>;

    /// Releases residency (if any) and destroys the texture.
    fn release_texture(&mut self, texture: TextureId) -> Result<(), Error>;

    /// Creates a fixed-size buffer initialized with `contents`.
    fn create_buffer(
        &mut self,
        usage: GPUBufferUsage,
        contents: &[u8],
        debug_name: &str,
    ) -> Result<BufferId, Error>;

    /// Compiles and links a program.  Failure carries the backend's diagnostic text.
    fn link_program(&mut self, program: &ProgramDescriptor) -> Result<ProgramId, Error>;

    /// Binds the program, its slot buffers, the mesh, the indirect buffer and every resident
    /// texture.  Called once, before the first frame.
    fn bind(&mut self, program: ProgramId, bindings: &BindStyle) -> Result<(), Error>;

    /// Clears the render target at the start of the next frame.
    fn clear(&mut self, color: Float4) -> Result<(), Error>;

    /// Issues one indexed indirect multidraw reading `draw_count` descriptors, `stride`
    /// bytes apart, from the bound indirect buffer.
    fn multi_draw_indexed_indirect(&mut self, draw_count: u32, stride: u32) -> Result<(), Error>;

    /// Finishes the frame.
    fn present(&mut self) -> Result<(), Error>;

    /// Reads back the most recently presented frame.
    fn capture_frame(&mut self) -> Result<FrameCapture, Error>;
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("The backend refused to allocate {resource}: {reason}")]
    ResourceExhausted {
        resource: &'static str,
        reason: String,
    },
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),
    #[error("Unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("Unknown program {0:?}")]
    UnknownProgram(ProgramId),
    #[error("Program {label} failed to link: {diagnostics}")]
    Link { label: String, diagnostics: String },
    #[error("Nothing is bound")]
    NotConfigured,
    #[error("Draw reads {needed} bytes from a {available}-byte {buffer} buffer")]
    OutOfBounds {
        buffer: &'static str,
        needed: u64,
        available: u64,
    },
    #[error("Unsupported indirect stride {0}")]
    UnsupportedStride(u32),
    #[error("Unsupported: {0}")]
    Unsupported(&'static str),
    #[error("No frame has been presented")]
    NoFrame,
    #[cfg(feature = "backend_wgpu")]
    #[error("wgpu: {0}")]
    Wgpu(#[from] self::wgpu::WgpuError),
}

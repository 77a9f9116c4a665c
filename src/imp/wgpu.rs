// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The wgpu backend.

Residency is membership in a texture binding array.  [`Backend::make_texture_resident`]
assigns the texture the next array slot and returns a handle whose low word is that slot and
whose high word is this backend's tag with the texture's sampler kind in its low two bits.
The array, the four samplers and both instance tables are bound once, by [`Backend::bind`];
after that the resident set is frozen.

A frame is encoded lazily: `clear` and `multi_draw_indexed_indirect` record what the frame
wants and `present` encodes one render pass, submits it and presents.

```no_run
use bindless_multidraw::imp::TargetConfig;
use bindless_multidraw::imp::wgpu::WgpuBackend;

let backend = test_executors::sleep_on(WgpuBackend::headless(TargetConfig::default()))
    .expect("no bindless-capable adapter");
```
*/

mod bound_device;
mod buffer;
mod entry_point;
mod error;
mod pipeline;
mod pixel_format;
mod sampler;
mod target;
mod texture;

pub use error::WgpuError;

use crate::bindings::BindStyle;
use crate::bindings::handle_table::BindlessHandle;
use crate::bindings::texture_allocator::TextureDescriptor;
use crate::bindings::visible_to::GPUBufferUsage;
use crate::images::frame::FrameCapture;
use crate::images::indirect::DrawIndexedIndirect;
use crate::images::shader::ProgramDescriptor;
use crate::imp::{Backend, BufferId, Error, ProgramId, TargetConfig, TextureId};
use crate::pixel_formats::{Float4, TexelFormat};
use bound_device::BoundDevice;
use buffer::Buffer;
use entry_point::EntryPoint;
use pipeline::{BoundPipeline, Program, TableBinding};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use sampler::Samplers;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use target::RenderTarget;
use texture::Texture;

static NEXT_TAG: AtomicU32 = AtomicU32::new(1);

/// Tags occupy bits 31..2 of a handle's high word.
const TAG_MASK: u32 = 0x3FFF_FFFF;

#[derive(Debug)]
struct Bound {
    pipeline: BoundPipeline,
    vertices: BufferId,
    indices: BufferId,
    indirect: BufferId,
}

/// What `present` will encode.
#[derive(Debug, Default)]
struct PendingFrame {
    clear: Option<Float4>,
    draws: Vec<u32>,
}

#[derive(Debug)]
pub struct WgpuBackend {
    //drop order: everything on the device before the device itself
    bound: Option<Bound>,
    textures: HashMap<TextureId, Texture>,
    /// Residency slots, in handle order.  A released texture leaves a hole.
    slots: Vec<Option<TextureId>>,
    buffers: Vec<Buffer>,
    programs: Vec<Program>,
    samplers: Samplers,
    target: RenderTarget,
    pending: PendingFrame,
    presented: bool,
    next_texture: u32,
    tag: u32,
    max_resident_textures: usize,
    bound_device: BoundDevice,
    _entry_point: EntryPoint,
}

impl WgpuBackend {
    /// Opens the default adapter and renders to an offscreen RGBA8 target that can be
    /// captured.
    pub async fn headless(target: TargetConfig) -> Result<Self, Error> {
        let entry_point = EntryPoint::new();
        let bound_device = BoundDevice::bind(&entry_point, None).await?;
        let target = RenderTarget::headless(&bound_device, target);
        Ok(Self::new(entry_point, bound_device, target))
    }

    /// Opens an adapter compatible with `window` and presents to it.
    pub async fn for_window<W>(window: W, target: TargetConfig) -> Result<Self, Error>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let entry_point = EntryPoint::new();
        let surface = entry_point
            .0
            .create_surface(window)
            .map_err(WgpuError::from)?;
        let bound_device = BoundDevice::bind(&entry_point, Some(&surface)).await?;
        let target = RenderTarget::surface(&bound_device, surface, target)?;
        Ok(Self::new(entry_point, bound_device, target))
    }

    fn new(entry_point: EntryPoint, bound_device: BoundDevice, target: RenderTarget) -> Self {
        let limits = bound_device.device.limits();
        WgpuBackend {
            bound: None,
            textures: HashMap::new(),
            slots: Vec::new(),
            buffers: Vec::new(),
            programs: Vec::new(),
            samplers: Samplers::new(&bound_device.device),
            target,
            pending: PendingFrame::default(),
            presented: false,
            next_texture: 0,
            tag: NEXT_TAG.fetch_add(1, Ordering::Relaxed) & TAG_MASK,
            max_resident_textures: limits.max_binding_array_elements_per_shader_stage as usize,
            bound_device,
            _entry_point: entry_point,
        }
    }

    /// Lowers the residency cap below the device's binding array limit.
    pub fn with_max_resident_textures(mut self, max: usize) -> Self {
        self.max_resident_textures = self.max_resident_textures.min(max);
        self
    }

    /// The adapter's name, as the driver reports it.
    pub fn adapter_name(&self) -> String {
        self.bound_device.adapter.get_info().name
    }

    pub fn resident_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn buffer(&self, id: BufferId) -> Result<&Buffer, Error> {
        self.buffers.get(id.0 as usize).ok_or(Error::UnknownBuffer(id))
    }

    fn buffer_with_usage(&self, id: BufferId, usage: GPUBufferUsage) -> Result<&Buffer, Error> {
        let buffer = self.buffer(id)?;
        if buffer.usage != usage {
            logwise::error_sync!(
                "buffer bound as {expected} was created as {actual}",
                expected = logwise::privacy::LogIt(&usage),
                actual = logwise::privacy::LogIt(&buffer.usage)
            );
            return Err(Error::Unsupported("buffer bound with a usage it was not created for"));
        }
        Ok(buffer)
    }

    /// Checks queued descriptors against the bound buffers before they reach the GPU.
    fn check_draw(&self, bound: &Bound, draw_count: u32) -> Result<(), Error> {
        let indirect = self.buffer(bound.indirect)?;
        let shadow = indirect.shadow.as_deref().unwrap_or_default();
        let stride = DrawIndexedIndirect::STRIDE as usize;
        let needed = draw_count as u64 * stride as u64;
        if needed > shadow.len() as u64 {
            return Err(Error::OutOfBounds {
                buffer: "indirect",
                needed,
                available: shadow.len() as u64,
            });
        }
        let index_len = self.buffer(bound.indices)?.len();
        for chunk in shadow.chunks_exact(stride).take(draw_count as usize) {
            let command = DrawIndexedIndirect::read(chunk);
            if command.is_noop() {
                continue;
            }
            if command.first_instance != 0 && !self.bound_device.has_first_instance() {
                return Err(Error::Unsupported(
                    "non-zero first_instance without INDIRECT_FIRST_INSTANCE",
                ));
            }
            if command.indices().end * 4 > index_len {
                return Err(Error::OutOfBounds {
                    buffer: "index",
                    needed: command.indices().end * 4,
                    available: index_len,
                });
            }
        }
        Ok(())
    }

    /// A view for holes left by released textures, so every array slot is valid.
    fn placeholder(&self) -> Result<Texture, Error> {
        Texture::new(
            &self.bound_device,
            &TextureDescriptor::new(1, 1, TexelFormat::Rgba8Unorm).with_debug_name("released slot"),
            &[0, 0, 0, 0],
        )
    }
}

impl Backend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn target_size(&self) -> (u32, u32) {
        self.target.size()
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        content: &[u8],
    ) -> Result<TextureId, Error> {
        let texture = Texture::new(&self.bound_device, descriptor, content)?;
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn make_texture_resident(&mut self, texture: TextureId) -> Result<BindlessHandle, Error> {
        let next_slot = self.slots.len();
        let bound = self.bound.is_some();
        let entry = self
            .textures
            .get_mut(&texture)
            .ok_or(Error::UnknownTexture(texture))?;
        let high = (self.tag << 2) | sampler::sampler_index(entry.descriptor.sampler);
        if let Some(slot) = entry.slot {
            return Ok(BindlessHandle::from_parts(high, slot));
        }
        if bound {
            return Err(Error::Unsupported("residency is fixed once bound"));
        }
        if next_slot >= self.max_resident_textures {
            return Err(Error::ResourceExhausted {
                resource: "resident texture",
                reason: format!(
                    "all {} binding array slots are in use",
                    self.max_resident_textures
                ),
            });
        }
        let slot = next_slot as u32;
        entry.slot = Some(slot);
        self.slots.push(Some(texture));
        Ok(BindlessHandle::from_parts(high, slot))
    }

    fn release_texture(&mut self, texture: TextureId) -> Result<(), Error> {
        let entry = self
            .textures
            .remove(&texture)
            .ok_or(Error::UnknownTexture(texture))?;
        if let Some(slot) = entry.slot {
            self.slots[slot as usize] = None;
        }
        entry.texture.destroy();
        Ok(())
    }

    fn create_buffer(
        &mut self,
        usage: GPUBufferUsage,
        contents: &[u8],
        debug_name: &str,
    ) -> Result<BufferId, Error> {
        if contents.is_empty() {
            return Err(Error::Unsupported("zero-sized buffer"));
        }
        let buffer = Buffer::new(&self.bound_device, usage, contents, debug_name)?;
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(buffer);
        Ok(id)
    }

    fn link_program(&mut self, program: &ProgramDescriptor) -> Result<ProgramId, Error> {
        let linked = pipeline::link(&self.bound_device, program)?;
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(linked);
        Ok(id)
    }

    fn bind(&mut self, program: ProgramId, bindings: &BindStyle) -> Result<(), Error> {
        if self.bound.is_some() {
            return Err(Error::Unsupported("the pipeline binds once"));
        }
        let linked = self
            .programs
            .get(program.0 as usize)
            .ok_or(Error::UnknownProgram(program))?;
        let interface = &linked.descriptor.interface;
        let mut tables = Vec::new();
        for (slot, info) in bindings.slots() {
            let usage = if slot == interface.parameter_slot {
                GPUBufferUsage::VertexShaderRead
            } else if slot == interface.handle_slot {
                GPUBufferUsage::FragmentShaderRead
            } else {
                return Err(Error::Unsupported("buffer bound to a slot the program does not declare"));
            };
            let buffer = self.buffer_with_usage(info.buffer, usage)?;
            tables.push(TableBinding {
                slot: slot.index(),
                stage: info.stage,
                buffer: &buffer.buffer,
            });
        }
        if tables.len() != 2 {
            return Err(Error::NotConfigured);
        }
        let vertices = bindings.vertex_buffer().ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(vertices, GPUBufferUsage::VertexBuffer)?;
        let indices = bindings.index_buffer().ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(indices, GPUBufferUsage::Index)?;
        let indirect = bindings.indirect_buffer().ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(indirect, GPUBufferUsage::Indirect)?;

        let placeholder = if self.slots.iter().any(Option::is_none) {
            Some(self.placeholder()?)
        } else {
            None
        };
        let mut views = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let view = match slot.and_then(|id| self.textures.get(&id)) {
                Some(texture) => &texture.view,
                None => match &placeholder {
                    Some(p) => &p.view,
                    None => return Err(Error::Unsupported("resident slot without a texture")),
                },
            };
            views.push(view);
        }

        let bound_pipeline = pipeline::bind(
            &self.bound_device,
            linked,
            self.target.format(),
            &tables,
            &views,
            &self.samplers,
        )?;
        self.bound = Some(Bound {
            pipeline: bound_pipeline,
            vertices,
            indices,
            indirect,
        });
        Ok(())
    }

    fn clear(&mut self, color: Float4) -> Result<(), Error> {
        self.pending.clear = Some(color);
        Ok(())
    }

    fn multi_draw_indexed_indirect(&mut self, draw_count: u32, stride: u32) -> Result<(), Error> {
        let bound = self.bound.as_ref().ok_or(Error::NotConfigured)?;
        //wgpu reads tightly packed descriptors
        if stride != DrawIndexedIndirect::STRIDE {
            return Err(Error::UnsupportedStride(stride));
        }
        self.check_draw(bound, draw_count)?;
        self.pending.draws.push(draw_count);
        Ok(())
    }

    fn present(&mut self) -> Result<(), Error> {
        let pending = std::mem::take(&mut self.pending);
        let frame = self.target.acquire()?;
        let mut encoder =
            self.bound_device
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("bindless multidraw frame"),
                });
        {
            let load = match pending.clear {
                Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                    r: c.r as f64,
                    g: c.g as f64,
                    b: c.b as f64,
                    a: c.a as f64,
                }),
                None => wgpu::LoadOp::Load,
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bindless multidraw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            let draws: Vec<u32> = pending.draws.into_iter().filter(|&d| d > 0).collect();
            if !draws.is_empty() {
                let bound = self.bound.as_ref().ok_or(Error::NotConfigured)?;
                render_pass.set_pipeline(&bound.pipeline.pipeline);
                render_pass.set_bind_group(0, &bound.pipeline.tables, &[]);
                render_pass.set_bind_group(1, &bound.pipeline.textures, &[]);
                render_pass.set_vertex_buffer(0, self.buffer(bound.vertices)?.buffer.slice(..));
                render_pass.set_index_buffer(
                    self.buffer(bound.indices)?.buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                let indirect = &self.buffer(bound.indirect)?.buffer;
                for draw_count in draws {
                    render_pass.multi_draw_indexed_indirect(indirect, 0, draw_count);
                }
            }
        }
        self.bound_device.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.presented = true;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<FrameCapture, Error> {
        if !self.presented {
            return Err(Error::NoFrame);
        }
        self.target.capture(&self.bound_device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_leave_room_for_the_sampler_kind() {
        let high = (TAG_MASK << 2) | 3;
        let handle = BindlessHandle::from_parts(high, 7);
        assert_eq!(handle.slot(), 7);
        assert_eq!(handle.tag() & 3, 3);
        assert_eq!(handle.tag() >> 2, TAG_MASK);
    }
}

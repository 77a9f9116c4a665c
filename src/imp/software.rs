// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A deterministic CPU backend.

The software backend executes the same pipeline a GPU would: it reads the indirect descriptor
out of the bound buffer, fans each command out over its instance range, fetches
`parameters[instance]` and `handles[instance]` from the bound table buffers, transforms the
mesh with the linked program's vertex transform, and samples each instance's texture through
its handle.

Every multidraw is recorded as a [`DrawRecord`], so tests can check what was submitted as well
as what was drawn.  Sampling a handle that is not resident panics, the way a GPU would fault.
*/

mod raster;
mod sampling;

use crate::bindings::BindStyle;
use crate::bindings::bind_style::BindSlot;
use crate::bindings::handle_table::BindlessHandle;
use crate::bindings::texture_allocator::TextureDescriptor;
use crate::bindings::visible_to::GPUBufferUsage;
use crate::bittricks::{mix64, u32s_to_u64};
use crate::images::frame::FrameCapture;
use crate::images::indirect::DrawIndexedIndirect;
use crate::images::shader::{FRAGMENT_ENTRY_POINT, ProgramDescriptor, VERTEX_ENTRY_POINT};
use crate::images::vertex_layout::Vertex;
use crate::bindings::parameter_table::InstanceParams;
use crate::imp::{Backend, BufferId, Error, ProgramId, TargetConfig, TextureId};
use crate::pixel_formats::{Float4, Unorm4};
use raster::{ClipVertex, Target};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TAG: AtomicU32 = AtomicU32::new(1);

/// Resource limits the software backend enforces, to exercise exhaustion paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftwareLimits {
    pub max_resident_textures: usize,
    pub max_buffer_bytes: usize,
}

impl Default for SoftwareLimits {
    fn default() -> Self {
        Self {
            max_resident_textures: 4096,
            max_buffer_bytes: 1 << 28,
        }
    }
}

/// One submitted multidraw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Zero-based frame the draw was issued in.
    pub frame: u64,
    pub draw_count: u32,
    pub stride: u32,
    /// The descriptors read from the indirect buffer.
    pub commands: Vec<DrawIndexedIndirect>,
    pub instances_drawn: u64,
    pub triangles: u64,
    /// Pixels written by all instances.
    pub pixels_written: u64,
}

#[derive(Debug)]
struct Texture {
    descriptor: TextureDescriptor,
    content: Vec<u8>,
    handle: Option<BindlessHandle>,
}

#[derive(Debug)]
struct Buffer {
    usage: GPUBufferUsage,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
struct Bound {
    program: ProgramId,
    parameters: BufferId,
    handles: BufferId,
    vertices: BufferId,
    indices: BufferId,
    indirect: BufferId,
}

#[derive(Debug)]
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    limits: SoftwareLimits,
    tag: u32,
    next_texture: u32,
    textures: HashMap<TextureId, Texture>,
    resident: HashMap<BindlessHandle, TextureId>,
    buffers: Vec<Buffer>,
    programs: Vec<ProgramDescriptor>,
    bound: Option<Bound>,
    bind_count: usize,
    framebuffer: Vec<Unorm4>,
    presented: Option<FrameCapture>,
    draws: Vec<DrawRecord>,
    frame: u64,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// A backend rendering to the default 256x256 target.
    pub fn new() -> Self {
        Self::for_target(TargetConfig::default())
    }

    pub fn for_target(target: TargetConfig) -> Self {
        Self::with_target(target.width, target.height)
    }

    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn with_target(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "render target {width}x{height} is empty");
        Self {
            width,
            height,
            limits: SoftwareLimits::default(),
            tag: NEXT_TAG.fetch_add(1, Ordering::Relaxed),
            next_texture: 0,
            textures: HashMap::new(),
            resident: HashMap::new(),
            buffers: Vec::new(),
            programs: Vec::new(),
            bound: None,
            bind_count: 0,
            framebuffer: vec![Unorm4::default(); width as usize * height as usize],
            presented: None,
            draws: Vec::new(),
            frame: 0,
        }
    }

    pub fn with_limits(mut self, limits: SoftwareLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Every multidraw submitted so far, in order.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Number of `bind` calls.  The pipeline binds exactly once.
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    pub fn is_resident(&self, handle: BindlessHandle) -> bool {
        self.resident.contains_key(&handle)
    }

    /// Live (not yet released) textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn buffer_len(&self, buffer: BufferId) -> Option<usize> {
        self.buffers.get(buffer.0 as usize).map(|b| b.bytes.len())
    }

    /**
    Samples a texture through its bindless handle, as the fragment stage does.

    # Panics

    Panics if the handle is not resident.
    */
    pub fn sample(&self, handle: BindlessHandle, uv: [f32; 2]) -> Unorm4 {
        Unorm4::from_floats(self.sample_float(handle, uv))
    }

    fn sample_float(&self, handle: BindlessHandle, uv: [f32; 2]) -> Float4 {
        let texture = self
            .resident
            .get(&handle)
            .and_then(|id| self.textures.get(id));
        match texture {
            Some(texture) => sampling::sample(&texture.descriptor, &texture.content, uv),
            None => panic!("Sampled bindless handle {handle:?}, which is not resident"),
        }
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

    fn slot_buffer(
        &self,
        bindings: &BindStyle,
        slot: BindSlot,
        usage: GPUBufferUsage,
    ) -> Result<BufferId, Error> {
        let (_, id) = bindings.storage_buffer(slot).ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(id, usage)?;
        Ok(id)
    }
}

fn f32_at(bytes: &[u8], at: usize) -> f32 {
    f32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn check_len(buffer: &'static str, needed: u64, available: usize) -> Result<(), Error> {
    if needed > available as u64 {
        return Err(Error::OutOfBounds {
            buffer,
            needed,
            available: available as u64,
        });
    }
    Ok(())
}

impl Backend for SoftwareBackend {
    fn name(&self) -> &'static str {
        "software"
    }

    fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        content: &[u8],
    ) -> Result<TextureId, Error> {
        if content.len() > self.limits.max_buffer_bytes {
            return Err(Error::ResourceExhausted {
                resource: "texture",
                reason: format!(
                    "{} bytes exceeds the {}-byte limit",
                    content.len(),
                    self.limits.max_buffer_bytes
                ),
            });
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            Texture {
                descriptor: descriptor.clone(),
                content: content.to_vec(),
                handle: None,
            },
        );
        Ok(id)
    }

    fn make_texture_resident(&mut self, texture: TextureId) -> Result<BindlessHandle, Error> {
        let resident_count = self.resident.len();
        let tag = self.tag;
        let entry = self
            .textures
            .get_mut(&texture)
            .ok_or(Error::UnknownTexture(texture))?;
        if let Some(handle) = entry.handle {
            return Ok(handle);
        }
        if resident_count >= self.limits.max_resident_textures {
            return Err(Error::ResourceExhausted {
                resource: "resident texture",
                reason: format!(
                    "all {} residency slots are in use",
                    self.limits.max_resident_textures
                ),
            });
        }
        let handle = BindlessHandle::from_raw(mix64(u32s_to_u64(tag, texture.0)));
        entry.handle = Some(handle);
        self.resident.insert(handle, texture);
        Ok(handle)
    }

    fn release_texture(&mut self, texture: TextureId) -> Result<(), Error> {
        let entry = self
            .textures
            .remove(&texture)
            .ok_or(Error::UnknownTexture(texture))?;
        if let Some(handle) = entry.handle {
            self.resident.remove(&handle);
        }
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
        if contents.len() > self.limits.max_buffer_bytes {
            return Err(Error::ResourceExhausted {
                resource: "buffer",
                reason: format!(
                    "{debug_name} is {} bytes, limit {}",
                    contents.len(),
                    self.limits.max_buffer_bytes
                ),
            });
        }
        let id = BufferId(self.buffers.len() as u32);
        logwise::trace_sync!(
            "software buffer {name} ({len} bytes)",
            name = logwise::privacy::LogIt(&debug_name),
            len = contents.len()
        );
        self.buffers.push(Buffer {
            usage,
            bytes: contents.to_vec(),
        });
        Ok(id)
    }

    fn link_program(&mut self, program: &ProgramDescriptor) -> Result<ProgramId, Error> {
        let module = program.wgsl_module();
        let mut diagnostics = Vec::new();
        for entry in [VERTEX_ENTRY_POINT, FRAGMENT_ENTRY_POINT] {
            if !module.contains(&format!("fn {entry}(")) && !module.contains(&format!("fn {entry} (")) {
                diagnostics.push(format!("missing entry point {entry}"));
            }
        }
        for slot in [program.interface.parameter_slot, program.interface.handle_slot] {
            if !module.contains(&format!("@binding({})", slot.index())) {
                diagnostics.push(format!("no declaration at binding {}", slot.index()));
            }
        }
        if program.interface.vertex_layout != Vertex::layout() {
            diagnostics.push(
                "vertex layout must be position: F32x3, tex_coord: F32x2".to_string(),
            );
        }
        if !diagnostics.is_empty() {
            return Err(Error::Link {
                label: program.label.clone(),
                diagnostics: diagnostics.join("\n"),
            });
        }
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(program.clone());
        Ok(id)
    }

    fn bind(&mut self, program: ProgramId, bindings: &BindStyle) -> Result<(), Error> {
        let interface = &self
            .programs
            .get(program.0 as usize)
            .ok_or(Error::UnknownProgram(program))?
            .interface;
        let parameters = self.slot_buffer(
            bindings,
            interface.parameter_slot,
            GPUBufferUsage::VertexShaderRead,
        )?;
        let handles = self.slot_buffer(
            bindings,
            interface.handle_slot,
            GPUBufferUsage::FragmentShaderRead,
        )?;
        let vertices = bindings.vertex_buffer().ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(vertices, GPUBufferUsage::VertexBuffer)?;
        let indices = bindings.index_buffer().ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(indices, GPUBufferUsage::Index)?;
        let indirect = bindings.indirect_buffer().ok_or(Error::NotConfigured)?;
        self.buffer_with_usage(indirect, GPUBufferUsage::Indirect)?;

        self.bound = Some(Bound {
            program,
            parameters,
            handles,
            vertices,
            indices,
            indirect,
        });
        self.bind_count += 1;
        logwise::info_sync!(
            "software backend bound with {resident} resident textures",
            resident = self.resident.len()
        );
        Ok(())
    }

    fn clear(&mut self, color: Float4) -> Result<(), Error> {
        let color = Unorm4::from_floats(color);
        self.framebuffer.fill(color);
        Ok(())
    }

    fn multi_draw_indexed_indirect(&mut self, draw_count: u32, stride: u32) -> Result<(), Error> {
        let bound = self.bound.ok_or(Error::NotConfigured)?;
        if stride < DrawIndexedIndirect::STRIDE || stride % 4 != 0 {
            return Err(Error::UnsupportedStride(stride));
        }
        let transform = self.programs[bound.program.0 as usize].transform;
        let indirect = &self.buffer(bound.indirect)?.bytes;
        if draw_count > 0 {
            let needed = (draw_count as u64 - 1) * stride as u64 + DrawIndexedIndirect::STRIDE as u64;
            check_len("indirect", needed, indirect.len())?;
        }
        let commands: Vec<DrawIndexedIndirect> = (0..draw_count as usize)
            .map(|d| DrawIndexedIndirect::read(&indirect[d * stride as usize..]))
            .collect();

        let parameters = &self.buffer(bound.parameters)?.bytes;
        let handles = &self.buffer(bound.handles)?.bytes;
        let vertex_bytes = &self.buffer(bound.vertices)?.bytes;
        let index_bytes = &self.buffer(bound.indices)?.bytes;
        let vertex_stride = std::mem::size_of::<Vertex>();

        // resolve every instance's inputs before touching the framebuffer
        let mut work = Vec::new();
        let mut draw_record = DrawRecord {
            frame: self.frame,
            draw_count,
            stride,
            commands: commands.clone(),
            instances_drawn: 0,
            triangles: 0,
            pixels_written: 0,
        };
        for command in &commands {
            if command.is_noop() {
                continue;
            }
            check_len("instance parameter", command.instances().end * 8, parameters.len())?;
            check_len("bindless handle", command.instances().end * 8, handles.len())?;
            check_len("index", command.indices().end * 4, index_bytes.len())?;
            let mut vertices = Vec::with_capacity(command.index_count as usize);
            for i in command.indices() {
                let at = i as usize * 4;
                let index = u32::from_ne_bytes([
                    index_bytes[at],
                    index_bytes[at + 1],
                    index_bytes[at + 2],
                    index_bytes[at + 3],
                ]) as i64
                    + command.base_vertex as i64;
                if index < 0 {
                    return Err(Error::OutOfBounds {
                        buffer: "vertex",
                        needed: 0,
                        available: vertex_bytes.len() as u64,
                    });
                }
                let at = index as usize * vertex_stride;
                check_len("vertex", (at + vertex_stride) as u64, vertex_bytes.len())?;
                vertices.push(Vertex::new(
                    [f32_at(vertex_bytes, at), f32_at(vertex_bytes, at + 4), f32_at(vertex_bytes, at + 8)],
                    [f32_at(vertex_bytes, at + 12), f32_at(vertex_bytes, at + 16)],
                ));
            }
            for instance in command.instances() {
                let at = instance as usize * 8;
                let params = InstanceParams::new(f32_at(parameters, at), f32_at(parameters, at + 4));
                let raw = u64::from_ne_bytes([
                    handles[at],
                    handles[at + 1],
                    handles[at + 2],
                    handles[at + 3],
                    handles[at + 4],
                    handles[at + 5],
                    handles[at + 6],
                    handles[at + 7],
                ]);
                work.push((params, BindlessHandle::from_raw(raw), vertices.clone()));
            }
            draw_record.instances_drawn += command.instance_count as u64;
            draw_record.triangles += command.instance_count as u64 * (command.index_count as u64 / 3);
        }

        let mut framebuffer = std::mem::take(&mut self.framebuffer);
        let mut target = Target {
            width: self.width,
            height: self.height,
            pixels: &mut framebuffer,
        };
        for (params, handle, vertices) in &work {
            for triangle in vertices.chunks_exact(3) {
                let clip = |v: &Vertex| ClipVertex {
                    clip: transform.apply(v.position, *params),
                    uv: v.tex_coord,
                };
                let corners = [clip(&triangle[0]), clip(&triangle[1]), clip(&triangle[2])];
                draw_record.pixels_written +=
                    raster::fill_triangle(&mut target, corners, |uv| self.sample(*handle, uv));
            }
        }
        self.framebuffer = framebuffer;

        logwise::trace_sync!(
            "software multidraw: {instances} instances, {pixels} pixels",
            instances = draw_record.instances_drawn,
            pixels = draw_record.pixels_written
        );
        self.draws.push(draw_record);
        Ok(())
    }

    fn present(&mut self) -> Result<(), Error> {
        self.presented = Some(FrameCapture::new(
            self.width,
            self.height,
            self.framebuffer.clone(),
        ));
        self.frame += 1;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<FrameCapture, Error> {
        self.presented.clone().ok_or(Error::NoFrame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::TexelFormat;

    fn texture(backend: &mut SoftwareBackend, color: [u8; 4]) -> TextureId {
        backend
            .create_texture(&TextureDescriptor::default(), &color)
            .unwrap()
    }

    #[test]
    fn residency_is_idempotent_and_sampled_exactly() {
        let mut backend = SoftwareBackend::new();
        let t = texture(&mut backend, [10, 20, 30, 40]);
        let a = backend.make_texture_resident(t).unwrap();
        let b = backend.make_texture_resident(t).unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.resident_count(), 1);
        assert_eq!(backend.sample(a, [0.5, 0.5]), Unorm4 { r: 10, g: 20, b: 30, a: 40 });
    }

    #[test]
    fn handles_differ_between_backends() {
        let mut one = SoftwareBackend::new();
        let mut two = SoftwareBackend::new();
        let a = texture(&mut one, [0; 4]);
        let b = texture(&mut two, [0; 4]);
        assert_ne!(
            one.make_texture_resident(a).unwrap(),
            two.make_texture_resident(b).unwrap()
        );
    }

    #[test]
    #[should_panic(expected = "not resident")]
    fn sampling_a_released_handle_panics() {
        let mut backend = SoftwareBackend::new();
        let t = texture(&mut backend, [0; 4]);
        let h = backend.make_texture_resident(t).unwrap();
        backend.release_texture(t).unwrap();
        backend.sample(h, [0.0, 0.0]);
    }

    #[test]
    fn residency_limit_is_exhaustion() {
        let mut backend = SoftwareBackend::new().with_limits(SoftwareLimits {
            max_resident_textures: 1,
            ..Default::default()
        });
        let a = texture(&mut backend, [0; 4]);
        let b = texture(&mut backend, [0; 4]);
        backend.make_texture_resident(a).unwrap();
        assert!(matches!(
            backend.make_texture_resident(b),
            Err(Error::ResourceExhausted { .. })
        ));
        //already-resident textures are still fine
        assert!(backend.make_texture_resident(a).is_ok());
    }

    #[test]
    fn draw_before_bind_is_not_configured() {
        let mut backend = SoftwareBackend::new();
        assert!(matches!(
            backend.multi_draw_indexed_indirect(1, 20),
            Err(Error::NotConfigured)
        ));
    }

    #[test]
    fn capture_needs_a_presented_frame() {
        let mut backend = SoftwareBackend::with_target(2, 2);
        assert!(matches!(backend.capture_frame(), Err(Error::NoFrame)));
        backend
            .clear(Float4 {
                r: 1.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            })
            .unwrap();
        backend.present().unwrap();
        let capture = backend.capture_frame().unwrap();
        assert_eq!(capture.pixel(1, 1), Unorm4 { r: 255, g: 0, b: 0, a: 255 });
    }

    #[test]
    fn r8_textures_sample_as_red() {
        let mut backend = SoftwareBackend::new();
        let t = backend
            .create_texture(&TextureDescriptor::new(1, 1, TexelFormat::R8Unorm), &[255])
            .unwrap();
        let h = backend.make_texture_resident(t).unwrap();
        assert_eq!(backend.sample(h, [0.5, 0.5]), Unorm4 { r: 255, g: 0, b: 0, a: 255 });
    }
}

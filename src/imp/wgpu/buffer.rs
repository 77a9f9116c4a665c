// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::visible_to::GPUBufferUsage;
use crate::imp::Error;
use crate::imp::wgpu::bound_device::BoundDevice;
use wgpu::util::DeviceExt;

impl GPUBufferUsage {
    /// Converts this buffer usage to the corresponding wgpu buffer usage flags.
    pub(super) const fn wgpu_usage(&self) -> wgpu::BufferUsages {
        match self {
            GPUBufferUsage::VertexShaderRead | GPUBufferUsage::FragmentShaderRead => {
                wgpu::BufferUsages::STORAGE
            }
            GPUBufferUsage::VertexBuffer => wgpu::BufferUsages::VERTEX,
            GPUBufferUsage::Index => wgpu::BufferUsages::INDEX,
            GPUBufferUsage::Indirect => wgpu::BufferUsages::INDIRECT,
        }
    }
}

#[derive(Debug)]
pub(super) struct Buffer {
    pub(super) buffer: wgpu::Buffer,
    pub(super) usage: GPUBufferUsage,
    /// Host copy of indirect descriptors, so draws can be checked before submission.
    pub(super) shadow: Option<Vec<u8>>,
}

impl Buffer {
    pub(super) fn new(
        bound_device: &BoundDevice,
        usage: GPUBufferUsage,
        contents: &[u8],
        debug_name: &str,
    ) -> Result<Self, Error> {
        let max = bound_device.device.limits().max_buffer_size;
        if contents.len() as u64 > max {
            return Err(Error::ResourceExhausted {
                resource: "buffer",
                reason: format!("{debug_name} is {} bytes, limit {max}", contents.len()),
            });
        }
        if usage.is_shader_read() {
            let max = bound_device.device.limits().max_storage_buffer_binding_size as u64;
            if contents.len() as u64 > max {
                return Err(Error::ResourceExhausted {
                    resource: "storage buffer",
                    reason: format!("{debug_name} is {} bytes, binding limit {max}", contents.len()),
                });
            }
        }
        let (buffer, error) = bound_device.validation_scope(|device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(debug_name),
                contents,
                usage: usage.wgpu_usage(),
            })
        });
        if let Some(error) = error {
            return Err(Error::ResourceExhausted {
                resource: "buffer",
                reason: error.to_string(),
            });
        }
        let shadow = (usage == GPUBufferUsage::Indirect).then(|| contents.to_vec());
        Ok(Buffer {
            buffer,
            usage,
            shadow,
        })
    }

    pub(super) fn len(&self) -> u64 {
        self.buffer.size()
    }
}

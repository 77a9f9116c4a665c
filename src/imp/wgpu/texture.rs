// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::bindings::texture_allocator::TextureDescriptor;
use crate::imp::Error;
use crate::imp::wgpu::bound_device::BoundDevice;
use wgpu::Extent3d;
use wgpu::util::{DeviceExt, TextureDataOrder};

/// A sampled texture and its residency slot, if it has one.
#[derive(Debug)]
pub(super) struct Texture {
    pub(super) texture: wgpu::Texture,
    pub(super) view: wgpu::TextureView,
    pub(super) descriptor: TextureDescriptor,
    pub(super) slot: Option<u32>,
}

impl Texture {
    pub(super) fn new(
        bound_device: &BoundDevice,
        descriptor: &TextureDescriptor,
        content: &[u8],
    ) -> Result<Self, Error> {
        let max = bound_device.device.limits().max_texture_dimension_2d;
        if descriptor.width > max || descriptor.height > max {
            return Err(Error::ResourceExhausted {
                resource: "texture",
                reason: format!(
                    "{}x{} exceeds the {max} texel dimension limit",
                    descriptor.width, descriptor.height
                ),
            });
        }
        let wgpu_descriptor = wgpu::TextureDescriptor {
            label: Some(descriptor.debug_name),
            size: Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format.wgpu_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        };
        let (texture, error) = bound_device.validation_scope(|device| {
            device.create_texture_with_data(
                &bound_device.queue,
                &wgpu_descriptor,
                TextureDataOrder::LayerMajor,
                content,
            )
        });
        if let Some(error) = error {
            return Err(Error::ResourceExhausted {
                resource: "texture",
                reason: error.to_string(),
            });
        }
        logwise::trace_sync!(
            "wgpu texture {name} {width}x{height}",
            name = logwise::privacy::LogIt(&descriptor.debug_name),
            width = descriptor.width,
            height = descriptor.height
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Texture {
            texture,
            view,
            descriptor: descriptor.clone(),
            slot: None,
        })
    }
}

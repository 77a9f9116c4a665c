// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Program linking and the one-time bind.

The texture binding array is sized to the resident set when the pipeline is bound, so every
slot a handle can name holds a live view and no partially-bound array support is needed.
*/

use crate::bindings::bind_style::Stage;
use crate::images::shader::{FRAGMENT_ENTRY_POINT, ProgramDescriptor, VERTEX_ENTRY_POINT};
use crate::images::vertex_layout::{VertexFieldType, VertexLayout};
use crate::imp::Error;
use crate::imp::wgpu::bound_device::BoundDevice;
use crate::imp::wgpu::sampler::Samplers;
use std::borrow::Cow;
use std::num::NonZeroU32;

/// A compiled program.
#[derive(Debug)]
pub(super) struct Program {
    pub(super) descriptor: ProgramDescriptor,
    pub(super) module: wgpu::ShaderModule,
}

pub(super) fn link(bound_device: &BoundDevice, descriptor: &ProgramDescriptor) -> Result<Program, Error> {
    let source = descriptor.wgsl_module();
    let (module, error) = bound_device.validation_scope(|device| {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&descriptor.label),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
        })
    });
    let info = test_executors::spin_on(module.get_compilation_info());
    let mut diagnostics: Vec<String> = info
        .messages
        .iter()
        .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
        .map(|m| match &m.location {
            Some(location) => format!(
                "{}:{}: {}",
                location.line_number, location.line_position, m.message
            ),
            None => m.message.clone(),
        })
        .collect();
    if let Some(error) = error {
        if diagnostics.is_empty() {
            diagnostics.push(error.to_string());
        }
    }
    if !diagnostics.is_empty() {
        return Err(Error::Link {
            label: descriptor.label.clone(),
            diagnostics: diagnostics.join("\n"),
        });
    }
    Ok(Program {
        descriptor: descriptor.clone(),
        module,
    })
}

fn vertex_format(r#type: VertexFieldType) -> wgpu::VertexFormat {
    match r#type {
        VertexFieldType::F32 => wgpu::VertexFormat::Float32,
        VertexFieldType::F32x2 => wgpu::VertexFormat::Float32x2,
        VertexFieldType::F32x3 => wgpu::VertexFormat::Float32x3,
    }
}

fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .offsets()
        .enumerate()
        .map(|(location, (offset, field))| wgpu::VertexAttribute {
            format: vertex_format(field.r#type),
            offset: offset as u64,
            shader_location: location as u32,
        })
        .collect()
}

fn stage_visibility(stage: Stage) -> wgpu::ShaderStages {
    match stage {
        Stage::Vertex => wgpu::ShaderStages::VERTEX,
        Stage::Fragment => wgpu::ShaderStages::FRAGMENT,
    }
}

/// A storage table bound at one slot of group 0.
pub(super) struct TableBinding<'a> {
    pub(super) slot: u32,
    pub(super) stage: Stage,
    pub(super) buffer: &'a wgpu::Buffer,
}

/// Everything a frame needs, fixed at bind time.
#[derive(Debug)]
pub(super) struct BoundPipeline {
    pub(super) pipeline: wgpu::RenderPipeline,
    pub(super) tables: wgpu::BindGroup,
    pub(super) textures: wgpu::BindGroup,
}

pub(super) fn bind(
    bound_device: &BoundDevice,
    program: &Program,
    target_format: wgpu::TextureFormat,
    tables: &[TableBinding<'_>],
    views: &[&wgpu::TextureView],
    samplers: &Samplers,
) -> Result<BoundPipeline, Error> {
    let resident = NonZeroU32::new(views.len() as u32)
        .ok_or(Error::Unsupported("binding with no resident textures"))?;
    let label = program.descriptor.label.as_str();

    let table_layout_entries: Vec<wgpu::BindGroupLayoutEntry> = tables
        .iter()
        .map(|t| wgpu::BindGroupLayoutEntry {
            binding: t.slot,
            visibility: stage_visibility(t.stage),
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    let mut texture_layout_entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: Some(resident),
    }];
    for binding in 1..=samplers.samplers.len() as u32 {
        texture_layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    let (bound, error) = bound_device.validation_scope(|device| {
        let table_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("instance tables"),
            entries: &table_layout_entries,
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("resident textures"),
            entries: &texture_layout_entries,
        });
        let table_entries: Vec<wgpu::BindGroupEntry> = tables
            .iter()
            .map(|t| wgpu::BindGroupEntry {
                binding: t.slot,
                resource: t.buffer.as_entire_binding(),
            })
            .collect();
        let tables_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("instance tables"),
            layout: &table_layout,
            entries: &table_entries,
        });
        let mut texture_entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureViewArray(views),
        }];
        for (i, sampler) in samplers.samplers.iter().enumerate() {
            texture_entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let textures_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("resident textures"),
            layout: &texture_layout,
            entries: &texture_entries,
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&table_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let vertex_layout = &program.descriptor.interface.vertex_layout;
        let attributes = vertex_attributes(vertex_layout);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &program.module,
                entry_point: Some(VERTEX_ENTRY_POINT),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: vertex_layout.element_stride() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &program.module,
                entry_point: Some(FRAGMENT_ENTRY_POINT),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });
        BoundPipeline {
            pipeline,
            tables: tables_group,
            textures: textures_group,
        }
    });
    if let Some(error) = error {
        logwise::error_sync!(
            "binding {label} failed: {error}",
            label = logwise::privacy::LogIt(&label),
            error = logwise::privacy::LogIt(&error)
        );
        return Err(Error::Link {
            label: label.to_string(),
            diagnostics: error.to_string(),
        });
    }
    logwise::info_sync!(
        "bound {label} with {resident} resident textures",
        label = logwise::privacy::LogIt(&label),
        resident = resident.get()
    );
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::vertex_layout::Vertex;

    #[test]
    fn vertex_attributes_follow_layout() {
        let attributes = vertex_attributes(&Vertex::layout());
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[1].shader_location, 1);
    }
}

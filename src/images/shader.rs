// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Shader program descriptions.

A program is a vertex and a fragment shader (WGSL, entry points `vs_main` and `fs_main`), the
interface it expects from the host, and the vertex transform it applies.  The interface is a
binary contract with the instance tables, fixed at build time; the engine checks it before
linking.

The program this crate ships, [`ProgramDescriptor::bindless_grid`], reads the instance
parameter table at slot 0 in the vertex stage and the handle table at slot 1 in the fragment
stage, both indexed by the pipeline's instance index.
*/

use crate::bindings::bind_style::{BindSlot, Stage};
use crate::bindings::handle_table::BindlessHandle;
use crate::bindings::parameter_table::InstanceParams;
use crate::images::vertex_layout::{Vertex, VertexLayout};

pub const VERTEX_ENTRY_POINT: &str = "vs_main";
pub const FRAGMENT_ENTRY_POINT: &str = "fs_main";

#[derive(Debug, Clone)]
pub struct FragmentShader {
    //may need additional type design for future backends
    pub(crate) wgsl_code: String,
}

#[derive(Debug, Clone)]
pub struct VertexShader {
    //may need additional type design for future backends
    pub(crate) wgsl_code: String,
}

impl FragmentShader {
    pub fn new(wgsl_code: String) -> Self {
        Self { wgsl_code }
    }
    pub fn wgsl_code(&self) -> &str {
        &self.wgsl_code
    }
}

impl VertexShader {
    pub fn new(wgsl_code: String) -> Self {
        Self { wgsl_code }
    }
    pub fn wgsl_code(&self) -> &str {
        &self.wgsl_code
    }
}

/// `clip = position * scale + (offset + bias, 0)`, `w = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexTransform {
    pub scale: f32,
    pub bias: [f32; 2],
}

impl Default for VertexTransform {
    fn default() -> Self {
        Self {
            scale: 0.2,
            bias: [0.125, 0.125],
        }
    }
}

impl VertexTransform {
    /// Clip-space position of `position` for an instance with `params`.
    pub fn apply(&self, position: [f32; 3], params: InstanceParams) -> [f32; 4] {
        [
            position[0] * self.scale + params.x + self.bias[0],
            position[1] * self.scale + params.y + self.bias[1],
            position[2] * self.scale,
            1.0,
        ]
    }
}

/// What a program expects the host to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInterface {
    pub parameter_slot: BindSlot,
    pub parameter_stage: Stage,
    pub parameter_record_size: u64,
    pub handle_slot: BindSlot,
    pub handle_stage: Stage,
    pub handle_record_size: u64,
    pub vertex_layout: VertexLayout,
}

impl ProgramInterface {
    /// The interface of the bindless grid program.
    pub fn bindless_grid() -> Self {
        Self {
            parameter_slot: BindSlot::new(0),
            parameter_stage: Stage::Vertex,
            parameter_record_size: 8,
            handle_slot: BindSlot::new(1),
            handle_stage: Stage::Fragment,
            handle_record_size: 8,
            vertex_layout: Vertex::layout(),
        }
    }

    /// Checks the interface against the record types the host uploads.
    pub fn check_host_layout(&self) -> Result<(), InterfaceMismatch> {
        let host_parameter = std::mem::size_of::<InstanceParams>() as u64;
        if self.parameter_record_size != host_parameter {
            return Err(InterfaceMismatch::ParameterRecordSize {
                program: self.parameter_record_size,
                host: host_parameter,
            });
        }
        let host_handle = std::mem::size_of::<BindlessHandle>() as u64;
        if self.handle_record_size != host_handle {
            return Err(InterfaceMismatch::HandleRecordSize {
                program: self.handle_record_size,
                host: host_handle,
            });
        }
        if self.parameter_slot == self.handle_slot {
            return Err(InterfaceMismatch::SharedSlot(self.parameter_slot));
        }
        let host_vertex = Vertex::layout();
        if self.vertex_layout != host_vertex {
            return Err(InterfaceMismatch::VertexLayout {
                program_stride: self.vertex_layout.element_stride(),
                host_stride: host_vertex.element_stride(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InterfaceMismatch {
    #[error("Program expects {program}-byte parameter records, host uploads {host}")]
    ParameterRecordSize { program: u64, host: u64 },
    #[error("Program expects {program}-byte handles, host uploads {host}")]
    HandleRecordSize { program: u64, host: u64 },
    #[error("Both tables are declared at slot {0:?}")]
    SharedSlot(BindSlot),
    #[error("Program vertex layout (stride {program_stride}) differs from host vertices (stride {host_stride})")]
    VertexLayout {
        program_stride: usize,
        host_stride: usize,
    },
}

/// A complete program ready to link.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor {
    pub label: String,
    pub vertex: VertexShader,
    pub fragment: FragmentShader,
    pub interface: ProgramInterface,
    pub transform: VertexTransform,
}

impl ProgramDescriptor {
    /// The bindless grid program with the default transform.
    pub fn bindless_grid() -> Self {
        Self::bindless_grid_with(VertexTransform::default())
    }

    pub fn bindless_grid_with(transform: VertexTransform) -> Self {
        let interface = ProgramInterface::bindless_grid();
        let vertex = VertexShader::new(format!(
            "{tables}\n{vertex}",
            tables = TABLES_WGSL,
            vertex = vertex_wgsl(&transform)
        ));
        let fragment = FragmentShader::new(format!("{TABLES_WGSL}\n{FRAGMENT_WGSL}"));
        Self {
            label: "bindless grid".to_string(),
            vertex,
            fragment,
            interface,
            transform,
        }
    }

    /// The full module source: both stages share one module.
    pub fn wgsl_module(&self) -> String {
        if self.vertex.wgsl_code == self.fragment.wgsl_code {
            return self.vertex.wgsl_code.clone();
        }
        //both stages embed the shared declarations; keep one copy
        let fragment = self
            .fragment
            .wgsl_code
            .strip_prefix(TABLES_WGSL)
            .unwrap_or(&self.fragment.wgsl_code);
        format!("{}\n{}", self.vertex.wgsl_code, fragment)
    }
}

const TABLES_WGSL: &str = r#"struct InstanceParams {
    offset: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) @interpolate(flat) instance: u32,
}

@group(0) @binding(0) var<storage, read> parameters: array<InstanceParams>;
@group(0) @binding(1) var<storage, read> handles: array<vec2<u32>>;
@group(1) @binding(0) var textures: binding_array<texture_2d<f32>>;
@group(1) @binding(1) var repeat_nearest: sampler;
@group(1) @binding(2) var repeat_linear: sampler;
@group(1) @binding(3) var clamp_nearest: sampler;
@group(1) @binding(4) var clamp_linear: sampler;
"#;

fn vertex_wgsl(transform: &VertexTransform) -> String {
    format!(
        r#"@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @builtin(instance_index) instance: u32,
) -> VertexOutput {{
    let params = parameters[instance];
    let offset = params.offset + vec2<f32>({bx:?}, {by:?});
    var out: VertexOutput;
    out.clip = vec4<f32>(position * {scale:?} + vec3<f32>(offset, 0.0), 1.0);
    out.uv = uv;
    out.instance = instance;
    return out;
}}
"#,
        scale = transform.scale,
        bx = transform.bias[0],
        by = transform.bias[1],
    )
}

//handle.x is the texture slot, the low two bits of handle.y select the sampler
const FRAGMENT_WGSL: &str = r#"@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let handle = handles[in.instance];
    let slot = handle.x;
    var color: vec4<f32>;
    switch (handle.y & 3u) {
        case 0u: {
            color = textureSampleLevel(textures[slot], repeat_nearest, in.uv, 0.0);
        }
        case 1u: {
            color = textureSampleLevel(textures[slot], repeat_linear, in.uv, 0.0);
        }
        case 2u: {
            color = textureSampleLevel(textures[slot], clamp_nearest, in.uv, 0.0);
        }
        default: {
            color = textureSampleLevel(textures[slot], clamp_linear, in.uv, 0.0);
        }
    }
    return color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_interface_matches_host() {
        assert_eq!(ProgramInterface::bindless_grid().check_host_layout(), Ok(()));
    }

    #[test]
    fn mismatched_record_size_is_reported() {
        let mut interface = ProgramInterface::bindless_grid();
        interface.parameter_record_size = 16;
        assert_eq!(
            interface.check_host_layout(),
            Err(InterfaceMismatch::ParameterRecordSize {
                program: 16,
                host: 8
            })
        );
    }

    #[test]
    fn transform_places_grid_cells() {
        let t = VertexTransform::default();
        let clip = t.apply([0.0, 0.5, 0.0], InstanceParams::new(-1.0, -1.0));
        assert_eq!(clip, [-0.875, -0.775, 0.0, 1.0]);
    }

    #[test]
    fn module_contains_both_entry_points_once() {
        let program = ProgramDescriptor::bindless_grid();
        let module = program.wgsl_module();
        assert_eq!(module.matches("fn vs_main").count(), 1);
        assert_eq!(module.matches("fn fs_main").count(), 1);
        assert_eq!(module.matches("struct InstanceParams").count(), 1);
        assert!(module.contains("position * 0.2"));
    }
}

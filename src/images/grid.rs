// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The grid scene.

`columns x rows` instances of one triangle, each with its own 1x1 texture.  Instance `i` is
cell `(i % columns, i / columns)`.  Its texture is colored `R = x * 255 / columns`,
`G = y * 255 / rows`, `B = 128` (truncated), and its offset places it on a regular grid spanning
`[-1, 1] x [-1, 1]`.  Everything is drawn with a single indirect command of
`instance_count = columns * rows`.
*/

use crate::bindings::handle_table::BindlessHandleTable;
use crate::bindings::parameter_table::{InstanceParameterTable, InstanceParams};
use crate::bindings::texture_allocator::{self, TextureAllocator, TextureDescriptor};
use crate::images::engine::SceneResources;
use crate::images::indirect::DrawIndexedIndirect;
use crate::images::shader::{ProgramDescriptor, VertexTransform};
use crate::images::vertex_layout::Mesh;
use crate::imp::Backend;
use crate::pixel_formats::{RGBA8UNorm, Unorm4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridScene {
    pub columns: u32,
    pub rows: u32,
}

impl Default for GridScene {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 8,
        }
    }
}

impl GridScene {
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    pub const fn instance_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// The `(x, y)` cell of instance `i`.
    pub fn cell(&self, instance: u32) -> (u32, u32) {
        (instance % self.columns, instance / self.columns)
    }

    pub fn color(&self, x: u32, y: u32) -> Unorm4 {
        let inv_x = 255.0 / self.columns as f32;
        let inv_y = 255.0 / self.rows as f32;
        Unorm4 {
            r: (x as f32 * inv_x) as u8,
            g: (y as f32 * inv_y) as u8,
            b: 128,
            a: 255,
        }
    }

    pub fn offset(&self, x: u32, y: u32) -> InstanceParams {
        let inv_x = 2.0 / self.columns as f32;
        let inv_y = 2.0 / self.rows as f32;
        InstanceParams::new(x as f32 * inv_x - 1.0, y as f32 * inv_y - 1.0)
    }

    /// The mesh centroid of cell `(x, y)` in normalized device coordinates.
    pub fn cell_center_ndc(&self, x: u32, y: u32, transform: &VertexTransform) -> (f32, f32) {
        let mesh = Mesh::triangle();
        let n = mesh.vertices.len() as f32;
        let cx = mesh.vertices.iter().map(|v| v.position[0]).sum::<f32>() / n;
        let cy = mesh.vertices.iter().map(|v| v.position[1]).sum::<f32>() / n;
        let clip = transform.apply([cx, cy, 0.0], self.offset(x, y));
        (clip[0], clip[1])
    }

    /**
    Creates every texture and both tables on `backend`.

    Textures are created and made resident in instance order, so handle table entry `i` and
    parameter table entry `i` both belong to cell `self.cell(i)`.
    */
    pub fn build<B: Backend>(&self, backend: &mut B) -> Result<SceneResources, texture_allocator::Error> {
        let n = self.instance_count() as usize;
        logwise::info_sync!(
            "building {columns}x{rows} grid scene",
            columns = self.columns,
            rows = self.rows
        );
        let mut textures = TextureAllocator::new();
        let mut parameters = InstanceParameterTable::new(n);
        let mut handles = BindlessHandleTable::new(n);
        let descriptor = TextureDescriptor::default().with_debug_name("grid cell");
        for instance in 0..self.instance_count() {
            let (x, y) = self.cell(instance);
            let handle =
                textures.allocate::<RGBA8UNorm, _>(backend, &descriptor, &[self.color(x, y)])?;
            handles.push(handle);
            parameters.push(self.offset(x, y));
        }
        let mesh = Mesh::triangle();
        let draw = DrawIndexedIndirect::new(mesh.index_count() as u32, self.instance_count());
        Ok(SceneResources {
            textures,
            parameters,
            handles,
            mesh,
            draw,
            program: ProgramDescriptor::bindless_grid(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_truncate_like_the_demo() {
        let grid = GridScene::default();
        assert_eq!(grid.color(0, 0), Unorm4 { r: 0, g: 0, b: 128, a: 255 });
        assert_eq!(grid.color(1, 2), Unorm4 { r: 31, g: 63, b: 128, a: 255 });
        assert_eq!(grid.color(7, 7), Unorm4 { r: 223, g: 223, b: 128, a: 255 });
    }

    #[test]
    fn offsets_span_the_target() {
        let grid = GridScene::default();
        assert_eq!(grid.offset(0, 0), InstanceParams::new(-1.0, -1.0));
        assert_eq!(grid.offset(4, 2), InstanceParams::new(0.0, -0.5));
        assert_eq!(grid.offset(7, 7), InstanceParams::new(0.75, 0.75));
    }

    #[test]
    fn instances_are_row_major() {
        let grid = GridScene::new(8, 4);
        assert_eq!(grid.instance_count(), 32);
        assert_eq!(grid.cell(0), (0, 0));
        assert_eq!(grid.cell(9), (1, 1));
        assert_eq!(grid.cell(31), (7, 3));
    }

    #[test]
    fn build_produces_aligned_tables() {
        let mut backend = crate::imp::software::SoftwareBackend::new();
        let grid = GridScene::new(2, 2);
        let scene = grid.build(&mut backend).unwrap();
        assert_eq!(scene.handles.len(), 4);
        assert_eq!(scene.parameters.len(), 4);
        assert_eq!(scene.textures.len(), 4);
        assert_eq!(scene.draw.instance_count, 4);
        for (i, handle) in scene.textures.handles().enumerate() {
            assert_eq!(scene.handles.get(i), Some(handle));
        }
    }
}

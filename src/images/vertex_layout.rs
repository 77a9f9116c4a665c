// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vertex buffer layout descriptions, the vertex record, and meshes.
//!
//! The GPU needs to know how to interpret the raw bytes in a vertex buffer.  A
//! [`VertexLayout`] lists the attributes in memory order; attribute `n` is shader
//! `@location(n)`.
//!
//! # Example
//!
//! ```
//! use bindless_multidraw::images::vertex_layout::{Vertex, VertexLayout, VertexFieldType};
//!
//! let mut layout = VertexLayout::new();
//! layout.add_field("position", VertexFieldType::F32x3);
//! layout.add_field("tex_coord", VertexFieldType::F32x2);
//! assert_eq!(layout.element_stride(), 20);
//! assert_eq!(layout, Vertex::layout());
//! ```

use crate::bindings::visible_to::GPUBufferUsage;
use crate::imp::{self, Backend, BufferId};
use crate::pixel_formats::as_bytes;
use crate::pixel_formats::sealed::ReprC;

/// Describes the layout of a vertex buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexLayout {
    pub(crate) fields: Vec<VertexField>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexField {
    pub(crate) name: &'static str,
    pub(crate) r#type: VertexFieldType,
}

/// Specifies the data type of a vertex attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum VertexFieldType {
    F32,
    F32x2,
    F32x3,
}

impl VertexFieldType {
    pub(crate) fn stride(&self) -> usize {
        match self {
            VertexFieldType::F32 => 4,
            VertexFieldType::F32x2 => 8,
            VertexFieldType::F32x3 => 12,
        }
    }
}

impl VertexLayout {
    /// Creates a new, empty vertex layout.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a field to the vertex layout.
    ///
    /// Fields are added in the order they appear in memory.  The name is for debugging.
    pub fn add_field(&mut self, name: &'static str, r#type: VertexFieldType) {
        self.fields.push(VertexField { name, r#type });
    }

    /// Bytes between consecutive vertices.
    pub fn element_stride(&self) -> usize {
        self.fields.iter().map(|e| e.r#type.stride()).sum()
    }

    /// Byte offset of each field, in field order.
    pub(crate) fn offsets(&self) -> impl Iterator<Item = (usize, &VertexField)> + '_ {
        self.fields.iter().scan(0, |offset, field| {
            let this = *offset;
            *offset += field.r#type.stride();
            Some((this, field))
        })
    }
}

/// A vertex: object-space position and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
}
unsafe impl ReprC for Vertex {}

impl Vertex {
    pub const fn new(position: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            tex_coord,
        }
    }

    /// The layout matching this struct: position at location 0, tex_coord at location 1.
    pub fn layout() -> VertexLayout {
        let mut layout = VertexLayout::new();
        layout.add_field("position", VertexFieldType::F32x3);
        layout.add_field("tex_coord", VertexFieldType::F32x2);
        layout
    }
}

/// An indexed triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// A mesh after upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBuffers {
    pub vertices: BufferId,
    pub indices: BufferId,
    pub index_count: u32,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// The single triangle every grid instance draws.
    ///
    /// Wound clockwise, so pipelines drawing it must not cull.
    pub fn triangle() -> Self {
        Self::new(
            vec![
                Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0]),
                Vertex::new([0.0, 0.5, 0.0], [0.5, 1.0]),
                Vertex::new([0.5, -0.5, 0.0], [1.0, 0.0]),
            ],
            vec![0, 1, 2],
        )
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        as_bytes(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        // u32 is plain old data
        unsafe {
            std::slice::from_raw_parts(
                self.indices.as_ptr() as *const u8,
                std::mem::size_of_val(self.indices.as_slice()),
            )
        }
    }

    /// Uploads vertex and index buffers.
    pub fn upload<B: Backend>(&self, backend: &mut B) -> Result<MeshBuffers, imp::Error> {
        let vertices =
            backend.create_buffer(GPUBufferUsage::VertexBuffer, self.vertex_bytes(), "mesh vertices")?;
        let indices =
            backend.create_buffer(GPUBufferUsage::Index, self.index_bytes(), "mesh indices")?;
        Ok(MeshBuffers {
            vertices,
            indices,
            index_count: self.indices.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn vertex_matches_layout() {
        assert_eq!(size_of::<Vertex>(), 20);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, tex_coord), 12);
        let layout = Vertex::layout();
        assert_eq!(layout.element_stride(), size_of::<Vertex>());
        let offsets: Vec<usize> = layout.offsets().map(|(o, _)| o).collect();
        assert_eq!(offsets, vec![0, 12]);
    }

    #[test]
    fn triangle_is_one_indexed_triangle() {
        let mesh = Mesh::triangle();
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.vertex_bytes().len(), 60);
        assert_eq!(mesh.index_bytes().len(), 12);
        assert_eq!(mesh.vertices[1].tex_coord, [0.5, 1.0]);
    }
}

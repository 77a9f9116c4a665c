// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Defines the way resources are bound for the multidraw pipeline.
//!
//! A `BindStyle` is a description, built once at setup, of which buffer sits at which slot
//! and which stage reads it, plus the fixed-function inputs (vertex, index and indirect
//! buffers).  Backends consume it in [`crate::imp::Backend::bind`].  Resident textures are
//! not listed here: every texture made resident on a backend is bound by that backend.
//!
//! # Example
//!
//! ```
//! use bindless_multidraw::bindings::bind_style::{BindSlot, Stage};
//! use bindless_multidraw::bindings::BindStyle;
//! use bindless_multidraw::bindings::visible_to::GPUBufferUsage;
//! use bindless_multidraw::imp::Backend;
//! use bindless_multidraw::imp::software::SoftwareBackend;
//!
//! let mut backend = SoftwareBackend::new();
//! let parameters = backend
//!     .create_buffer(GPUBufferUsage::VertexShaderRead, &[0; 8], "parameters")
//!     .unwrap();
//! let mut bind_style = BindStyle::new();
//! bind_style.bind_storage_buffer(BindSlot::new(0), Stage::Vertex, parameters);
//! assert_eq!(bind_style.storage_buffer(BindSlot::new(0)), Some((Stage::Vertex, parameters)));
//! ```

use crate::imp::BufferId;
use std::collections::HashMap;

/// Describes how resources are bound for the pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindStyle {
    pub(crate) binds: HashMap<u32, BindInfo>,
    pub(crate) vertex_buffer: Option<BufferId>,
    pub(crate) index_buffer: Option<BufferId>,
    pub(crate) indirect_buffer: Option<BufferId>,
}

/// Information about a single slot binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindInfo {
    pub(crate) stage: Stage,
    pub(crate) buffer: BufferId,
}

impl BindStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a read-only storage buffer to a slot.
    ///
    /// # Panics
    ///
    /// Panics if a resource is already bound to the specified slot.
    pub fn bind_storage_buffer(&mut self, slot: BindSlot, stage: Stage, buffer: BufferId) {
        let old = self
            .binds
            .insert(slot.pass_index, BindInfo { stage, buffer });
        assert!(old.is_none(), "Already bound to slot {:?}", slot);
    }

    /// Binds the vertex buffer.  Its layout is the program's vertex layout.
    pub fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        assert!(self.vertex_buffer.is_none(), "Vertex buffer already bound");
        self.vertex_buffer = Some(buffer);
    }

    /// Binds the u32 index buffer.
    pub fn bind_index_buffer(&mut self, buffer: BufferId) {
        assert!(self.index_buffer.is_none(), "Index buffer already bound");
        self.index_buffer = Some(buffer);
    }

    /// Binds the buffer of indirect draw descriptors.
    pub fn bind_indirect_buffer(&mut self, buffer: BufferId) {
        assert!(self.indirect_buffer.is_none(), "Indirect buffer already bound");
        self.indirect_buffer = Some(buffer);
    }

    pub fn storage_buffer(&self, slot: BindSlot) -> Option<(Stage, BufferId)> {
        self.binds
            .get(&slot.pass_index)
            .map(|info| (info.stage, info.buffer))
    }

    pub fn vertex_buffer(&self) -> Option<BufferId> {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index_buffer
    }

    pub fn indirect_buffer(&self) -> Option<BufferId> {
        self.indirect_buffer
    }

    /// Slots in ascending order.
    pub(crate) fn slots(&self) -> Vec<(BindSlot, BindInfo)> {
        let mut slots: Vec<_> = self
            .binds
            .iter()
            .map(|(k, v)| (BindSlot::new(*k), *v))
            .collect();
        slots.sort_by_key(|(slot, _)| slot.pass_index);
        slots
    }
}

/// Identifies a binding slot in a shader.
///
/// Slot indices are the `@binding(n)` values of the table group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindSlot {
    pub(crate) pass_index: u32,
}

impl BindSlot {
    pub const fn new(pass_index: u32) -> Self {
        Self { pass_index }
    }

    pub const fn index(self) -> u32 {
        self.pass_index
    }
}

/// Specifies which shader stage a resource is visible to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "Already bound to slot")]
    fn double_bind_panics() {
        let mut style = BindStyle::new();
        style.bind_storage_buffer(BindSlot::new(0), Stage::Vertex, BufferId(0));
        style.bind_storage_buffer(BindSlot::new(0), Stage::Fragment, BufferId(1));
    }

    #[test]
    fn slots_are_sorted() {
        let mut style = BindStyle::new();
        style.bind_storage_buffer(BindSlot::new(1), Stage::Fragment, BufferId(7));
        style.bind_storage_buffer(BindSlot::new(0), Stage::Vertex, BufferId(3));
        let slots = style.slots();
        assert_eq!(slots[0].0, BindSlot::new(0));
        assert_eq!(slots[1].1.buffer, BufferId(7));
    }
}

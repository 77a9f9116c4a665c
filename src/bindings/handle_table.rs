// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The bindless handle table.

A dense, instance-indexed array of 64-bit texture handles.  The fragment stage reads
`handles[instance_index]` and samples through it, so the host never issues a per-instance
bind.  The table is populated completely before it is uploaded; it is never appended to
afterwards.
*/

use crate::bindings::visible_to::GPUBufferUsage;
use crate::bittricks::{u32s_to_u64, u64_to_u32s};
use crate::fixed_table::FixedTable;
use crate::imp::{self, Backend, BufferId};
use crate::pixel_formats::as_bytes;
use crate::pixel_formats::sealed::ReprC;

/**
An opaque, GPU-resident reference to a texture's sampling state.

Handle values carry no ordering guarantee.  Only the position of a handle in a
[`BindlessHandleTable`] carries instance identity.

In memory a handle is a little-endian `u64`; shaders that lack 64-bit integers read it as
`vec2<u32>` with the low word first.
*/
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindlessHandle(u64);
unsafe impl ReprC for BindlessHandle {}

impl BindlessHandle {
    pub const fn from_raw(raw: u64) -> Self {
        BindlessHandle(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Builds a handle whose low word is a backend slot and whose high word is a tag.
    #[cfg_attr(not(feature = "backend_wgpu"), allow(dead_code))]
    pub(crate) fn from_parts(tag: u32, slot: u32) -> Self {
        BindlessHandle(u32s_to_u64(tag, slot))
    }

    /// The low 32 bits.
    #[cfg_attr(not(feature = "backend_wgpu"), allow(dead_code))]
    pub(crate) fn slot(self) -> u32 {
        u64_to_u32s(self.0).1
    }

    /// The high 32 bits.
    #[cfg_attr(not(feature = "backend_wgpu"), allow(dead_code))]
    pub(crate) fn tag(self) -> u32 {
        u64_to_u32s(self.0).0
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Can't upload an empty handle table")]
    Empty,
    #[error("Handle table is incomplete: {len} of {capacity} handles written")]
    Incomplete { len: usize, capacity: usize },
    #[error("Backend error {0}")]
    Backend(#[from] imp::Error),
}

/// Fixed-capacity table of handles, index-aligned with the instance parameter table.
#[derive(Debug, Clone, PartialEq)]
pub struct BindlessHandleTable {
    table: FixedTable<BindlessHandle>,
}

impl BindlessHandleTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: FixedTable::with_capacity(capacity),
        }
    }

    /// Builds a complete table; entry `i` belongs to instance `i`.
    pub fn from_handles(handles: &[BindlessHandle]) -> Self {
        Self {
            table: FixedTable::from_slice(handles),
        }
    }

    /// Appends the handle for the next instance, returning that instance's index.
    ///
    /// # Panics
    ///
    /// Panics if the table is already full.
    pub fn push(&mut self, handle: BindlessHandle) -> usize {
        self.table.push(handle)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn get(&self, instance: usize) -> Option<BindlessHandle> {
        self.table.get(instance).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = BindlessHandle> + '_ {
        self.table.iter().copied()
    }

    /// The exact bytes uploaded: `len() * 8`, little endian.
    pub fn as_bytes(&self) -> &[u8] {
        as_bytes(self.table.as_slice())
    }

    /// Uploads the table as one immutable buffer readable by the fragment stage.
    pub fn upload<B: Backend>(&self, backend: &mut B) -> Result<BufferId, Error> {
        if self.table.capacity() == 0 {
            return Err(Error::Empty);
        }
        if !self.table.is_complete() {
            return Err(Error::Incomplete {
                len: self.table.len(),
                capacity: self.table.capacity(),
            });
        }
        logwise::trace_sync!(
            "uploading handle table of {len} entries",
            len = self.table.len()
        );
        let id = backend.create_buffer(
            GPUBufferUsage::FragmentShaderRead,
            self.as_bytes(),
            "bindless handle table",
        )?;
        Ok(id)
    }
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The instance parameter table.

One [`InstanceParams`] per instance, laid out contiguously in instance order and uploaded as a
single buffer of exactly `N * 8` bytes.  The vertex stage reads `parameters[instance_index]`.

The record layout is a binary contract with the shader program.  A mismatch is silent
corruption rather than a detected error, so the layout is pinned by tests against
[`crate::images::shader::ProgramInterface`].
*/

use crate::bindings::visible_to::GPUBufferUsage;
use crate::fixed_table::FixedTable;
use crate::imp::{self, Backend, BufferId};
use crate::pixel_formats::as_bytes;
use crate::pixel_formats::sealed::ReprC;

/// Per-instance transform: an X then Y offset added in clip space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InstanceParams {
    pub x: f32,
    pub y: f32,
}
unsafe impl ReprC for InstanceParams {}

impl InstanceParams {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Can't upload an empty parameter table")]
    Empty,
    #[error("Parameter table is incomplete: {len} of {capacity} records written")]
    Incomplete { len: usize, capacity: usize },
    #[error("Backend error {0}")]
    Backend(#[from] imp::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceParameterTable {
    table: FixedTable<InstanceParams>,
}

impl InstanceParameterTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: FixedTable::with_capacity(capacity),
        }
    }

    pub fn from_records(records: &[InstanceParams]) -> Self {
        Self {
            table: FixedTable::from_slice(records),
        }
    }

    /// Appends the record for the next instance, returning that instance's index.
    ///
    /// # Panics
    ///
    /// Panics if the table is already full.
    pub fn push(&mut self, params: InstanceParams) -> usize {
        self.table.push(params)
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

    pub fn get(&self, instance: usize) -> Option<InstanceParams> {
        self.table.get(instance).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = InstanceParams> + '_ {
        self.table.iter().copied()
    }

    pub fn as_bytes(&self) -> &[u8] {
        as_bytes(self.table.as_slice())
    }

    /// Uploads the table as one buffer readable by the vertex stage.
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
            "uploading parameter table of {len} entries",
            len = self.table.len()
        );
        let id = backend.create_buffer(
            GPUBufferUsage::VertexShaderRead,
            self.as_bytes(),
            "instance parameters",
        )?;
        Ok(id)
    }
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The indirect draw descriptor.

One fixed-size record describing a batched indexed draw.  Its layout is exactly the indexed
indirect command GPUs consume, so the buffer is uploaded byte-for-byte and read by the
multidraw call with a stride of [`DrawIndexedIndirect::STRIDE`].
*/

use crate::pixel_formats::sealed::ReprC;
use std::ops::Range;

/// An indexed indirect draw command.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawIndexedIndirect {
    /// Number of indices per instance.
    pub index_count: u32,
    /// Number of instances; the pipeline supplies `first_instance..first_instance + instance_count`
    /// as the instance index.
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}
unsafe impl ReprC for DrawIndexedIndirect {}

impl DrawIndexedIndirect {
    /// Size in bytes of one record, and the stride between records.
    pub const STRIDE: u32 = std::mem::size_of::<Self>() as u32;

    /// Draws `index_count` indices for instances `0..instance_count`.
    pub const fn new(index_count: u32, instance_count: u32) -> Self {
        Self {
            index_count,
            instance_count,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }

    /// Reads a record the way the GPU does, from the first [`Self::STRIDE`] bytes of `bytes`.
    pub(crate) fn read(bytes: &[u8]) -> Self {
        let word = |i: usize| {
            let at = i * 4;
            u32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Self {
            index_count: word(0),
            instance_count: word(1),
            first_index: word(2),
            base_vertex: word(3) as i32,
            first_instance: word(4),
        }
    }

    /// Instance indices this command produces.
    pub fn instances(&self) -> Range<u64> {
        let first = self.first_instance as u64;
        first..first + self.instance_count as u64
    }

    /// Index-buffer positions this command reads.
    pub fn indices(&self) -> Range<u64> {
        let first = self.first_index as u64;
        first..first + self.index_count as u64
    }

    /**
    Checks the command against the tables and mesh it will be drawn with.

    Instances beyond the table length would read undefined table entries, and indices beyond
    the index buffer would read undefined vertices.  A draw that stops short of the end of the
    tables leaves instances without a draw.  All three are configuration errors; only
    `instance_count == 0` is accepted as a no-op.
    */
    pub fn validate(&self, table_len: usize, mesh_index_count: usize) -> Result<(), Error> {
        if self.instances().end > table_len as u64 {
            return Err(Error::InstanceRange {
                first_instance: self.first_instance,
                instance_count: self.instance_count,
                table_len,
            });
        }
        if self.instance_count != 0 && self.instances().end != table_len as u64 {
            return Err(Error::InstanceCoverage {
                first_instance: self.first_instance,
                instance_count: self.instance_count,
                table_len,
            });
        }
        if self.indices().end > mesh_index_count as u64 {
            return Err(Error::IndexRange {
                first_index: self.first_index,
                index_count: self.index_count,
                mesh_index_count,
            });
        }
        Ok(())
    }

    /// True if executing the command draws nothing.
    pub fn is_noop(&self) -> bool {
        self.instance_count == 0 || self.index_count == 0
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error(
        "Draw covers instances {first_instance}..+{instance_count} but the tables hold {table_len}"
    )]
    InstanceRange {
        first_instance: u32,
        instance_count: u32,
        table_len: usize,
    },
    #[error(
        "Draw covers instances {first_instance}..+{instance_count} but must reach the end of {table_len} table entries"
    )]
    InstanceCoverage {
        first_instance: u32,
        instance_count: u32,
        table_len: usize,
    },
    #[error(
        "Draw reads indices {first_index}..+{index_count} but the mesh has {mesh_index_count}"
    )]
    IndexRange {
        first_index: u32,
        index_count: u32,
        mesh_index_count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::as_bytes;
    use std::mem::offset_of;

    #[test]
    fn layout_is_the_indexed_indirect_command() {
        assert_eq!(DrawIndexedIndirect::STRIDE, 20);
        assert_eq!(offset_of!(DrawIndexedIndirect, index_count), 0);
        assert_eq!(offset_of!(DrawIndexedIndirect, instance_count), 4);
        assert_eq!(offset_of!(DrawIndexedIndirect, first_index), 8);
        assert_eq!(offset_of!(DrawIndexedIndirect, base_vertex), 12);
        assert_eq!(offset_of!(DrawIndexedIndirect, first_instance), 16);
        let bytes = as_bytes(&[DrawIndexedIndirect::new(3, 64)]).to_vec();
        assert_eq!(&bytes[0..4], &3u32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &64u32.to_ne_bytes());
    }

    #[test]
    fn instance_count_is_bounded_by_tables() {
        assert!(DrawIndexedIndirect::new(3, 10).validate(10, 3).is_ok());
        assert_eq!(
            DrawIndexedIndirect::new(3, 20).validate(10, 3),
            Err(Error::InstanceRange {
                first_instance: 0,
                instance_count: 20,
                table_len: 10
            })
        );
        let shifted = DrawIndexedIndirect {
            first_instance: 5,
            ..DrawIndexedIndirect::new(3, 6)
        };
        assert!(shifted.validate(10, 3).is_err());
    }

    #[test]
    fn partial_draws_are_rejected() {
        assert_eq!(
            DrawIndexedIndirect::new(3, 5).validate(64, 3),
            Err(Error::InstanceCoverage {
                first_instance: 0,
                instance_count: 5,
                table_len: 64
            })
        );
        let tail = DrawIndexedIndirect {
            first_instance: 4,
            ..DrawIndexedIndirect::new(3, 6)
        };
        assert!(tail.validate(10, 3).is_ok());
    }

    #[test]
    fn zero_instances_is_a_valid_noop() {
        let draw = DrawIndexedIndirect::new(3, 0);
        assert!(draw.validate(64, 3).is_ok());
        assert!(draw.is_noop());
    }

    #[test]
    fn index_range_is_bounded_by_mesh() {
        assert!(matches!(
            DrawIndexedIndirect::new(6, 1).validate(1, 3),
            Err(Error::IndexRange { .. })
        ));
    }
}

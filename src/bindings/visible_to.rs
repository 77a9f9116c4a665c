//! Buffer usage declarations.
//!
//! Every buffer the core creates is fixed-size and uploaded exactly once.  The usage
//! declared here tells the backend where it will be bound, which in turn decides the
//! storage semantics (vertex fetch, index fetch, read-only storage, indirect arguments).
//!
//! # Examples
//!
//! ```
//! use bindless_multidraw::bindings::visible_to::GPUBufferUsage;
//!
//! // The instance parameter table is read by the vertex stage
//! let parameters = GPUBufferUsage::VertexShaderRead;
//! assert!(parameters.is_shader_read());
//! ```

/// Describes how a buffer resource will be used on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GPUBufferUsage {
    /// The buffer will be read as data in the vertex shader.
    ///
    /// Bound as a read-only storage buffer.  The instance parameter table uses this.
    VertexShaderRead,

    /// The buffer will be read as data in the fragment shader.
    ///
    /// Bound as a read-only storage buffer.  The bindless handle table uses this.
    FragmentShaderRead,

    /// The buffer contains vertex attribute data.
    VertexBuffer,

    /// The buffer contains u32 index data for indexed drawing.
    Index,

    /// The buffer contains indexed indirect draw descriptors.
    Indirect,
}

impl GPUBufferUsage {
    /// True for buffers bound to a shader slot rather than a fixed-function input.
    pub const fn is_shader_read(self) -> bool {
        matches!(
            self,
            GPUBufferUsage::VertexShaderRead | GPUBufferUsage::FragmentShaderRead
        )
    }
}

#[cfg(test)]
mod tests {
    use super::GPUBufferUsage;

    #[test]
    fn only_table_usages_are_shader_reads() {
        assert!(GPUBufferUsage::VertexShaderRead.is_shader_read());
        assert!(GPUBufferUsage::FragmentShaderRead.is_shader_read());
        assert!(!GPUBufferUsage::VertexBuffer.is_shader_read());
        assert!(!GPUBufferUsage::Index.is_shader_read());
        assert!(!GPUBufferUsage::Indirect.is_shader_read());
    }
}

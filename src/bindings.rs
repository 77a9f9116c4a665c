/*! Defines binding types: textures made resident, the two instance tables, and the slots they bind to. */

pub mod sampler;
pub mod bind_style;
pub mod visible_to;
pub mod texture_allocator;
pub mod parameter_table;
pub mod handle_table;

pub use bind_style::BindStyle;
pub use handle_table::{BindlessHandle, BindlessHandleTable};
pub use parameter_table::{InstanceParameterTable, InstanceParams};
pub use texture_allocator::{TextureAllocator, TextureDescriptor};

/*! The rendering component: the Configured and Running states, and what they draw. */

pub use engine::{BoundScene, Engine, EngineConfig, SceneResources};
pub use port::{Port, RunReport};

pub mod engine;
pub mod port;
pub mod host;
pub mod grid;
pub mod frame;
pub mod indirect;
pub mod shader;
pub mod vertex_layout;

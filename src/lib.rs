/*! bindless_multidraw draws many independently-textured instances of a mesh in a single GPU
submission.

Each instance owns one texture, made resident so shaders can sample it through an opaque 64-bit
[`BindlessHandle`](bindings::BindlessHandle) rather than a texture binding.  Two dense,
instance-indexed tables are uploaded once:

| Table                      | Record                          | Slot | Read by  |
|----------------------------|---------------------------------|------|----------|
| Instance parameter table   | `x: f32, y: f32` (8 bytes)      | 0    | vertex   |
| Bindless handle table      | `u64` handle (8 bytes)          | 1    | fragment |

Every frame then issues exactly one indexed indirect multidraw reading one descriptor.  The GPU's
instance index is the key into both tables, so the host never iterates instances at draw time.

# Lifecycle

```
use bindless_multidraw::images::{Engine, EngineConfig};
use bindless_multidraw::images::grid::GridScene;
use bindless_multidraw::images::host::{FrameBudget, FramePacing};
use bindless_multidraw::imp::software::SoftwareBackend;

let mut backend = SoftwareBackend::with_target(64, 64);
let scene = GridScene::default().build(&mut backend).unwrap();
let config = EngineConfig { pacing: FramePacing::Vsync, ..Default::default() };
// Configured
let engine = Engine::configure(backend, config, scene).unwrap();
// Running
let mut port = engine.start();
let report = port.run(&mut FrameBudget::new(2)).unwrap();
assert_eq!(report.frames, 2);
let backend = port.shutdown().unwrap();
assert_eq!(backend.draws()[0].instances_drawn, 64);
```

# Backends

The [`imp::Backend`] trait is the seam.  [`imp::software::SoftwareBackend`] is a deterministic CPU
reference, always available.  With the default `backend_wgpu` feature, `imp::wgpu::WgpuBackend`
runs the same pipeline on a GPU through [wgpu](https://wgpu.rs), using texture binding arrays
for residency and `multi_draw_indexed_indirect` for submission.
*/

pub mod images;
pub mod bindings;
pub mod pixel_formats;
pub mod imp;
mod fixed_table;
mod bittricks;
mod sys;

logwise::declare_logging_domain!();

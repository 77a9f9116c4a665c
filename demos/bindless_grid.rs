//! Renders the 8x8 bindless grid and writes the frame to a PNG.
//!
//! Every one of the 64 triangles samples its own 1x1 texture through a bindless handle, and
//! the whole grid is a single indirect multidraw.  The frame loop runs a few frames at the
//! 100ms pacing, then the last frame is captured.
//!
//! ## Usage
//!
//! ```bash
//! # On a GPU, falling back to the software backend if no adapter has binding arrays:
//! cargo run --example bindless_grid -- grid.png
//!
//! # Software backend only:
//! cargo run --example bindless_grid --no-default-features -- grid.png
//! ```

use bindless_multidraw::images::grid::GridScene;
use bindless_multidraw::images::host::FrameBudget;
use bindless_multidraw::images::{Engine, EngineConfig};
use bindless_multidraw::imp::Backend;
use bindless_multidraw::imp::TargetConfig;
use bindless_multidraw::imp::software::SoftwareBackend;
use std::path::{Path, PathBuf};

const FRAMES: u64 = 5;

fn run<B: Backend>(mut backend: B, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Building scene on the {} backend...", backend.name());
    let scene = GridScene::default().build(&mut backend)?;
    let engine = Engine::configure(backend, EngineConfig::default(), scene)?;
    let mut port = engine.start();
    let report = port.run(&mut FrameBudget::new(FRAMES))?;
    println!(
        "Rendered {} frames in {:?} (slowest {:?})",
        report.frames, report.elapsed, report.slowest_frame
    );
    let frame = port.capture()?;
    frame.write_png(output)?;
    println!(
        "Wrote {} ({} distinct colors)",
        output.display(),
        frame.distinct_colors().len()
    );
    port.shutdown()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "bindless_grid.png".to_string())
        .into();
    let target = TargetConfig::default();

    #[cfg(feature = "backend_wgpu")]
    {
        use bindless_multidraw::imp::wgpu::WgpuBackend;
        match test_executors::sleep_on(WgpuBackend::headless(target)) {
            Ok(backend) => {
                println!("Using adapter {}", backend.adapter_name());
                return run(backend, &output);
            }
            Err(e) => println!("No usable GPU ({e}), falling back to software..."),
        }
    }
    run(SoftwareBackend::for_target(target), &output)
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The grid on a real adapter.  Needs `--features testing` and a GPU with texture binding
//! arrays; adapters without them skip.
#![cfg(all(feature = "testing", feature = "backend_wgpu"))]

use bindless_multidraw::images::grid::GridScene;
use bindless_multidraw::images::host::{FrameBudget, FramePacing};
use bindless_multidraw::images::shader::VertexTransform;
use bindless_multidraw::images::{Engine, EngineConfig};
use bindless_multidraw::imp::wgpu::{WgpuBackend, WgpuError};
use bindless_multidraw::imp::{self, Backend, TargetConfig};

fn backend() -> Option<WgpuBackend> {
    match test_executors::sleep_on(WgpuBackend::headless(TargetConfig::default())) {
        Ok(backend) => Some(backend),
        Err(imp::Error::Wgpu(e @ (WgpuError::NoSuchAdapter(_) | WgpuError::MissingFeatures(_)))) => {
            eprintln!("skipping: {e}");
            None
        }
        Err(e) => panic!("can't open wgpu backend: {e}"),
    }
}

#[test]
fn grid_renders_on_the_gpu() {
    let Some(mut backend) = backend() else {
        return;
    };
    assert_eq!(backend.target_size(), (256, 256));
    let grid = GridScene::default();
    let scene = grid.build(&mut backend).unwrap();
    let config = EngineConfig {
        pacing: FramePacing::Vsync,
        ..Default::default()
    };
    let mut port = Engine::configure(backend, config, scene).unwrap().start();
    let report = port.run(&mut FrameBudget::new(2)).unwrap();
    assert_eq!(report.frames, 2);

    let frame = port.capture().unwrap();
    let transform = VertexTransform::default();
    for y in 0..grid.rows {
        for x in 0..grid.columns {
            let (nx, ny) = grid.cell_center_ndc(x, y, &transform);
            assert_eq!(frame.pixel_at_ndc(nx, ny), grid.color(x, y), "cell ({x}, {y})");
        }
    }
    assert!(frame.distinct_colors().len() >= 64);
    let backend = port.shutdown().unwrap();
    assert_eq!(backend.resident_count(), 0);
}

#[test]
fn residency_is_idempotent_on_the_gpu() {
    let Some(mut backend) = backend() else {
        return;
    };
    let texture = backend
        .create_texture(&Default::default(), &[1, 2, 3, 4])
        .unwrap();
    let a = backend.make_texture_resident(texture).unwrap();
    let b = backend.make_texture_resident(texture).unwrap();
    assert_eq!(a, b);
    assert_eq!(backend.resident_count(), 1);
}

#[test]
fn residency_cap_is_exhaustion() {
    let Some(backend) = backend() else {
        return;
    };
    let mut backend = backend.with_max_resident_textures(4);
    let err = GridScene::default().build(&mut backend).unwrap_err();
    assert!(matches!(
        err,
        bindless_multidraw::bindings::texture_allocator::Error::Backend(
            imp::Error::ResourceExhausted { .. }
        )
    ));
}

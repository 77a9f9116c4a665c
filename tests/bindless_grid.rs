// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! End-to-end: an 8x8 grid of independently textured triangles drawn by one multidraw.

use bindless_multidraw::images::grid::GridScene;
use bindless_multidraw::images::host::{FrameBudget, FramePacing};
use bindless_multidraw::images::shader::VertexTransform;
use bindless_multidraw::images::{Engine, EngineConfig};
use bindless_multidraw::imp::software::SoftwareBackend;

fn config() -> EngineConfig {
    EngineConfig {
        pacing: FramePacing::Vsync,
        ..Default::default()
    }
}

#[test]
fn one_submission_draws_sixty_four_distinct_cells() {
    let grid = GridScene::default();
    let mut backend = SoftwareBackend::with_target(256, 256);
    let scene = grid.build(&mut backend).unwrap();
    let engine = Engine::configure(backend, config(), scene).unwrap();
    let mut port = engine.start();
    port.render_frame().unwrap();

    let draws = port.backend().draws();
    assert_eq!(draws.len(), 1);
    let draw = &draws[0];
    assert_eq!(draw.draw_count, 1);
    assert_eq!(draw.stride, 20);
    assert_eq!(draw.commands.len(), 1);
    assert_eq!(draw.commands[0].instance_count, 64);
    assert_eq!(draw.commands[0].index_count, 3);
    assert_eq!(draw.instances_drawn, 64);
    assert_eq!(draw.triangles, 64);

    let frame = port.capture().unwrap();
    let transform = VertexTransform::default();
    for y in 0..grid.rows {
        for x in 0..grid.columns {
            let (nx, ny) = grid.cell_center_ndc(x, y, &transform);
            assert_eq!(
                frame.pixel_at_ndc(nx, ny),
                grid.color(x, y),
                "cell ({x}, {y}) at ndc ({nx}, {ny})"
            );
        }
    }
    let colors = frame.distinct_colors();
    for instance in 0..grid.instance_count() {
        let (x, y) = grid.cell(instance);
        assert!(colors.contains(&grid.color(x, y)));
    }
    //64 cells plus the clear color
    assert_eq!(colors.len(), 65);
}

#[test]
fn tables_stay_index_aligned() {
    for grid in [GridScene::new(1, 1), GridScene::new(8, 8)] {
        let mut backend = SoftwareBackend::new();
        let scene = grid.build(&mut backend).unwrap();
        let n = grid.instance_count() as usize;
        assert_eq!(scene.handles.len(), n);
        assert_eq!(scene.parameters.len(), n);
        for i in 0..n {
            let (x, y) = grid.cell(i as u32);
            assert_eq!(scene.parameters.get(i), Some(grid.offset(x, y)));
            let handle = scene.handles.get(i).unwrap();
            //the handle at index i samples the texture made for instance i
            assert_eq!(backend.sample(handle, [0.5, 0.5]), grid.color(x, y));
        }
    }
}

#[test]
fn single_instance_renders_its_color() {
    let grid = GridScene::new(1, 1);
    let mut backend = SoftwareBackend::with_target(64, 64);
    let scene = grid.build(&mut backend).unwrap();
    let mut port = Engine::configure(backend, config(), scene).unwrap().start();
    port.render_frame().unwrap();
    let frame = port.capture().unwrap();
    let (nx, ny) = grid.cell_center_ndc(0, 0, &VertexTransform::default());
    assert_eq!(frame.pixel_at_ndc(nx, ny), grid.color(0, 0));
    assert_eq!(port.backend().draws()[0].instances_drawn, 1);
}

#[test]
fn every_frame_is_one_multidraw() {
    let mut backend = SoftwareBackend::with_target(64, 64);
    let scene = GridScene::default().build(&mut backend).unwrap();
    let mut port = Engine::configure(backend, config(), scene).unwrap().start();
    let report = port.run(&mut FrameBudget::new(4)).unwrap();
    assert_eq!(report.frames, 4);
    let draws = port.backend().draws();
    assert_eq!(draws.len(), 4);
    for (frame, draw) in draws.iter().enumerate() {
        assert_eq!(draw.frame, frame as u64);
        assert_eq!(draw.draw_count, 1);
        assert_eq!(draw.instances_drawn, 64);
    }
}

#[test]
fn captured_frame_encodes_as_png() {
    let mut backend = SoftwareBackend::with_target(32, 32);
    let scene = GridScene::new(2, 2).build(&mut backend).unwrap();
    let mut port = Engine::configure(backend, config(), scene).unwrap().start();
    port.render_frame().unwrap();
    let mut png = Vec::new();
    port.capture().unwrap().encode_png(&mut png).unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

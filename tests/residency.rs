// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Residency: handles are stable, sample exactly, and die with their texture.

use bindless_multidraw::bindings::sampler::{FilterMode, SamplerDescriptor, WrapMode};
use bindless_multidraw::bindings::{TextureAllocator, TextureDescriptor};
use bindless_multidraw::images::grid::GridScene;
use bindless_multidraw::images::host::FramePacing;
use bindless_multidraw::images::{Engine, EngineConfig};
use bindless_multidraw::imp::Backend;
use bindless_multidraw::imp::software::SoftwareBackend;
use bindless_multidraw::pixel_formats::{RGBA8UNorm, TexelFormat, Unorm4};

#[test]
fn single_texel_round_trips_through_its_handle() {
    let mut backend = SoftwareBackend::new();
    let mut allocator = TextureAllocator::new();
    let color = Unorm4 { r: 31, g: 63, b: 128, a: 255 };
    let handle = allocator
        .allocate::<RGBA8UNorm, _>(&mut backend, &TextureDescriptor::default(), &[color])
        .unwrap();
    for uv in [[0.5, 0.5], [0.0, 0.0], [1.0, 1.0], [-3.25, 7.5]] {
        assert_eq!(backend.sample(handle, uv), color);
    }
}

#[test]
fn making_resident_twice_returns_the_same_handle() {
    let mut backend = SoftwareBackend::new();
    let texture = backend
        .create_texture(&TextureDescriptor::default(), &[9, 8, 7, 6])
        .unwrap();
    let first = backend.make_texture_resident(texture).unwrap();
    let second = backend.make_texture_resident(texture).unwrap();
    assert_eq!(first, second);
    assert!(backend.is_resident(first));
    assert_eq!(backend.sample(second, [0.5, 0.5]), Unorm4 { r: 9, g: 8, b: 7, a: 6 });
}

#[test]
fn each_texture_keeps_its_own_sampler() {
    let mut backend = SoftwareBackend::new();
    let mut allocator = TextureAllocator::new();
    let black_white = [Unorm4 { r: 0, g: 0, b: 0, a: 255 }, Unorm4 { r: 255, g: 255, b: 255, a: 255 }];
    let nearest = allocator
        .allocate::<RGBA8UNorm, _>(
            &mut backend,
            &TextureDescriptor::new(2, 1, TexelFormat::Rgba8Unorm)
                .with_sampler(SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Nearest)),
            &black_white,
        )
        .unwrap();
    let linear = allocator
        .allocate::<RGBA8UNorm, _>(
            &mut backend,
            &TextureDescriptor::new(2, 1, TexelFormat::Rgba8Unorm)
                .with_sampler(SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Linear)),
            &black_white,
        )
        .unwrap();
    assert_ne!(nearest, linear);
    assert_eq!(backend.sample(nearest, [0.5, 0.5]).r, 255);
    assert_eq!(backend.sample(linear, [0.5, 0.5]).r, 128);
}

#[test]
fn residency_lasts_the_whole_run() {
    let mut backend = SoftwareBackend::with_target(32, 32);
    let scene = GridScene::new(4, 4).build(&mut backend).unwrap();
    let config = EngineConfig {
        pacing: FramePacing::Vsync,
        ..Default::default()
    };
    let mut port = Engine::configure(backend, config, scene).unwrap().start();
    for _ in 0..3 {
        port.render_frame().unwrap();
        let handles: Vec<_> = port.resources().handles.iter().collect();
        assert!(handles.iter().all(|h| port.backend().is_resident(*h)));
    }
}

#[test]
fn shutdown_releases_every_texture() {
    let mut backend = SoftwareBackend::with_target(32, 32);
    let scene = GridScene::new(4, 2).build(&mut backend).unwrap();
    let config = EngineConfig {
        pacing: FramePacing::Vsync,
        ..Default::default()
    };
    let mut port = Engine::configure(backend, config, scene).unwrap().start();
    port.render_frame().unwrap();
    let handles: Vec<_> = port.resources().handles.iter().collect();
    assert_eq!(port.backend().resident_count(), 8);

    let backend = port.shutdown().unwrap();
    assert_eq!(backend.resident_count(), 0);
    assert_eq!(backend.texture_count(), 0);
    assert!(handles.iter().all(|h| !backend.is_resident(*h)));
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Triangle setup and coverage for the software backend.

use crate::pixel_formats::Unorm4;

/// A post-transform vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ClipVertex {
    pub(super) clip: [f32; 4],
    pub(super) uv: [f32; 2],
}

/// A render target: row-major, rows top to bottom.
pub(super) struct Target<'a> {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) pixels: &'a mut [Unorm4],
}

fn to_window(width: u32, height: u32, v: &ClipVertex) -> [f32; 2] {
    let w = v.clip[3];
    let x = v.clip[0] / w;
    let y = v.clip[1] / w;
    [
        (x + 1.0) * 0.5 * width as f32,
        (1.0 - y) * 0.5 * height as f32,
    ]
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/**
Fills every pixel whose center lies inside the triangle, shading with the interpolated uv.

Both windings are accepted; nothing is culled.  Returns the number of pixels written.
*/
pub(super) fn fill_triangle<F>(target: &mut Target<'_>, vertices: [ClipVertex; 3], mut shade: F) -> u64
where
    F: FnMut([f32; 2]) -> Unorm4,
{
    let p: [[f32; 2]; 3] = [
        to_window(target.width, target.height, &vertices[0]),
        to_window(target.width, target.height, &vertices[1]),
        to_window(target.width, target.height, &vertices[2]),
    ];
    let area = edge(p[0], p[1], p[2]);
    if area == 0.0 || !area.is_finite() {
        return 0;
    }
    let min_x = p.iter().map(|v| v[0]).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let min_y = p.iter().map(|v| v[1]).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_x = (p.iter().map(|v| v[0]).fold(f32::NEG_INFINITY, f32::max).ceil())
        .min(target.width as f32) as u32;
    let max_y = (p.iter().map(|v| v[1]).fold(f32::NEG_INFINITY, f32::max).ceil())
        .min(target.height as f32) as u32;

    let mut written = 0;
    for py in min_y..max_y {
        for px in min_x..max_x {
            let center = [px as f32 + 0.5, py as f32 + 0.5];
            let b0 = edge(p[1], p[2], center) / area;
            let b1 = edge(p[2], p[0], center) / area;
            let b2 = edge(p[0], p[1], center) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }
            let uv = [
                b0 * vertices[0].uv[0] + b1 * vertices[1].uv[0] + b2 * vertices[2].uv[0],
                b0 * vertices[0].uv[1] + b1 * vertices[1].uv[1] + b2 * vertices[2].uv[1],
            ];
            target.pixels[(py * target.width + px) as usize] = shade(uv);
            written += 1;
        }
    }
    written
}

// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Texture sampling for the software backend.

use crate::bindings::sampler::FilterMode;
use crate::bindings::texture_allocator::TextureDescriptor;
use crate::pixel_formats::Float4;

fn texel(descriptor: &TextureDescriptor, content: &[u8], x: i64, y: i64) -> Float4 {
    let x = descriptor.sampler.wrap_coord(x, descriptor.width) as usize;
    let y = descriptor.sampler.wrap_coord(y, descriptor.height) as usize;
    let bpt = descriptor.format.bytes_per_texel() as usize;
    let offset = (y * descriptor.width as usize + x) * bpt;
    descriptor.format.decode(&content[offset..offset + bpt])
}

/// Samples at normalized coordinates the way a GPU sampler without mipmaps does.
pub(super) fn sample(descriptor: &TextureDescriptor, content: &[u8], uv: [f32; 2]) -> Float4 {
    let w = descriptor.width as f32;
    let h = descriptor.height as f32;
    match descriptor.sampler.filter {
        FilterMode::Nearest => {
            let x = (uv[0] * w).floor() as i64;
            let y = (uv[1] * h).floor() as i64;
            texel(descriptor, content, x, y)
        }
        FilterMode::Linear => {
            let x = uv[0] * w - 0.5;
            let y = uv[1] * h - 0.5;
            let x0 = x.floor();
            let y0 = y.floor();
            let fx = x - x0;
            let fy = y - y0;
            let (x0, y0) = (x0 as i64, y0 as i64);
            let top = texel(descriptor, content, x0, y0)
                .lerp(texel(descriptor, content, x0 + 1, y0), fx);
            let bottom = texel(descriptor, content, x0, y0 + 1)
                .lerp(texel(descriptor, content, x0 + 1, y0 + 1), fx);
            top.lerp(bottom, fy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::sampler::{SamplerDescriptor, WrapMode};
    use crate::pixel_formats::{TexelFormat, Unorm4};

    fn two_by_one(sampler: SamplerDescriptor) -> TextureDescriptor {
        TextureDescriptor::new(2, 1, TexelFormat::Rgba8Unorm).with_sampler(sampler)
    }

    const CONTENT: [u8; 8] = [0, 0, 0, 255, 255, 255, 255, 255];

    #[test]
    fn nearest_picks_texels() {
        let d = two_by_one(SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Nearest));
        assert_eq!(Unorm4::from_floats(sample(&d, &CONTENT, [0.25, 0.5])).r, 0);
        assert_eq!(Unorm4::from_floats(sample(&d, &CONTENT, [0.75, 0.5])).r, 255);
    }

    #[test]
    fn linear_blends_between_centers() {
        let d = two_by_one(SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Linear));
        let mid = Unorm4::from_floats(sample(&d, &CONTENT, [0.5, 0.5]));
        assert_eq!(mid.r, 128);
        assert_eq!(mid.a, 255);
    }

    #[test]
    fn repeat_wraps_across_the_edge() {
        let d = two_by_one(SamplerDescriptor::new(WrapMode::Repeat, FilterMode::Linear));
        //at u = 0 the left neighbour wraps to the white texel
        let edge = Unorm4::from_floats(sample(&d, &CONTENT, [0.0, 0.5]));
        assert_eq!(edge.r, 128);
    }

    #[test]
    fn single_texel_is_exact_everywhere() {
        let d = TextureDescriptor::default();
        let content = [31, 63, 128, 255];
        for uv in [[0.0, 0.0], [0.5, 1.0], [1.0, 0.0], [0.3, 0.7]] {
            let c = Unorm4::from_floats(sample(&d, &content, uv));
            assert_eq!(c, Unorm4 { r: 31, g: 63, b: 128, a: 255 });
        }
    }
}

use crate::pixel_formats::TexelFormat;

impl TexelFormat {
    pub(super) const fn wgpu_format(self) -> wgpu::TextureFormat {
        match self {
            TexelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TexelFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_sizes_agree_with_wgpu() {
        for format in [TexelFormat::Rgba8Unorm, TexelFormat::R8Unorm] {
            assert_eq!(
                format.wgpu_format().block_copy_size(None),
                Some(format.bytes_per_texel() as u32)
            );
        }
    }
}

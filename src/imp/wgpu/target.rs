// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Render targets: an offscreen texture, or a window surface.

use crate::images::frame::FrameCapture;
use crate::imp::wgpu::bound_device::BoundDevice;
use crate::imp::wgpu::error::WgpuError;
use crate::imp::{Error, TargetConfig};
use crate::pixel_formats::Unorm4;
use wgpu::TextureFormat;

pub(super) enum RenderTarget {
    Headless {
        texture: wgpu::Texture,
    },
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
}

impl std::fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderTarget::Headless { texture } => f
                .debug_struct("Headless")
                .field("size", &texture.size())
                .finish(),
            RenderTarget::Surface { config, .. } => f
                .debug_struct("Surface")
                .field("format", &config.format)
                .field("width", &config.width)
                .field("height", &config.height)
                .finish(),
        }
    }
}

/// A target texture acquired for one frame.
pub(super) enum FrameTexture {
    Headless(wgpu::TextureView),
    Surface {
        frame: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
}

impl FrameTexture {
    pub(super) fn view(&self) -> &wgpu::TextureView {
        match self {
            FrameTexture::Headless(view) => view,
            FrameTexture::Surface { view, .. } => view,
        }
    }

    pub(super) fn present(self) {
        if let FrameTexture::Surface { frame, .. } = self {
            frame.present();
        }
    }
}

impl RenderTarget {
    pub(super) fn headless(bound_device: &BoundDevice, target: TargetConfig) -> Self {
        let texture = bound_device.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("bindless multidraw target"),
            size: wgpu::Extent3d {
                width: target.width,
                height: target.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        RenderTarget::Headless { texture }
    }

    pub(super) fn surface(
        bound_device: &BoundDevice,
        surface: wgpu::Surface<'static>,
        target: TargetConfig,
    ) -> Result<Self, WgpuError> {
        let capabilities = surface.get_capabilities(&bound_device.adapter);
        //shader output is written as-is, so prefer a linear format
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(WgpuError::SurfaceFormat(TextureFormat::Rgba8Unorm))?;
        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: target.width,
            height: target.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: Vec::new(),
        };
        surface.configure(&bound_device.device, &config);
        logwise::info_sync!(
            "configured surface {format} {width}x{height}",
            format = logwise::privacy::LogIt(&format),
            width = target.width,
            height = target.height
        );
        Ok(RenderTarget::Surface { surface, config })
    }

    pub(super) fn format(&self) -> TextureFormat {
        match self {
            RenderTarget::Headless { texture } => texture.format(),
            RenderTarget::Surface { config, .. } => config.format,
        }
    }

    pub(super) fn size(&self) -> (u32, u32) {
        match self {
            RenderTarget::Headless { texture } => (texture.width(), texture.height()),
            RenderTarget::Surface { config, .. } => (config.width, config.height),
        }
    }

    pub(super) fn acquire(&self) -> Result<FrameTexture, WgpuError> {
        match self {
            RenderTarget::Headless { texture } => Ok(FrameTexture::Headless(
                texture.create_view(&wgpu::TextureViewDescriptor::default()),
            )),
            RenderTarget::Surface { surface, .. } => {
                let frame = surface.get_current_texture()?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(FrameTexture::Surface { frame, view })
            }
        }
    }

    /// Copies the offscreen target back to the host.
    pub(super) fn capture(&self, bound_device: &BoundDevice) -> Result<FrameCapture, Error> {
        let RenderTarget::Headless { texture } = self else {
            return Err(Error::Unsupported("capture of a window surface"));
        };
        let (width, height) = (texture.width(), texture.height());
        let unpadded = width * 4;
        let bytes_per_row = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let readback = bound_device.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame capture"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = bound_device
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame capture"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        bound_device.queue.submit(std::iter::once(encoder.finish()));

        let (sender, receiver) = std::sync::mpsc::channel();
        readback
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });
        bound_device.wait()?;
        let map_result = receiver
            .recv()
            .map_err(|_| WgpuError::Device("readback callback was dropped".to_string()))?;
        map_result.map_err(WgpuError::from)?;

        let pixels = {
            let mapped = readback.slice(..).get_mapped_range();
            read_color_pixels(&mapped, bytes_per_row, (width, height), texture.format())
        };
        readback.unmap();
        let pixels = pixels.ok_or(Error::Unsupported("capture of this target format"))?;
        Ok(FrameCapture::new(width, height, pixels))
    }
}

fn read_color_pixels(
    mapped: &[u8],
    bytes_per_row: u32,
    size: (u32, u32),
    format: TextureFormat,
) -> Option<Vec<Unorm4>> {
    let width = size.0 as usize;
    let height = size.1 as usize;
    let stride = bytes_per_row as usize;
    let row_bytes = width * 4;
    if stride < row_bytes {
        logwise::error_sync!(
            "Row stride {stride} smaller than a {expected}-byte row",
            stride = stride,
            expected = row_bytes
        );
        return None;
    }

    let mut pixels = Vec::with_capacity(width * height);
    for row in 0..height {
        let offset = row * stride;
        let row_slice = &mapped[offset..offset + row_bytes];
        match format {
            TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => {
                for chunk in row_slice.chunks_exact(4) {
                    pixels.push(Unorm4 { r: chunk[2], g: chunk[1], b: chunk[0], a: chunk[3] });
                }
            }
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => {
                for chunk in row_slice.chunks_exact(4) {
                    pixels.push(Unorm4 { r: chunk[0], g: chunk[1], b: chunk[2], a: chunk[3] });
                }
            }
            _ => {
                logwise::error_sync!(
                    "Unsupported texture format {format} for capture",
                    format = logwise::privacy::LogIt(&format)
                );
                return None;
            }
        }
    }
    Some(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_skipped() {
        let mut mapped = vec![0u8; 2 * 256];
        mapped[..4].copy_from_slice(&[1, 2, 3, 4]);
        mapped[256..260].copy_from_slice(&[5, 6, 7, 8]);
        let pixels = read_color_pixels(&mapped, 256, (1, 2), TextureFormat::Rgba8Unorm).unwrap();
        assert_eq!(pixels, vec![Unorm4 { r: 1, g: 2, b: 3, a: 4 }, Unorm4 { r: 5, g: 6, b: 7, a: 8 }]);
    }

    #[test]
    fn bgra_is_swizzled() {
        let mapped = [1u8, 2, 3, 4];
        let pixels = read_color_pixels(&mapped, 4, (1, 1), TextureFormat::Bgra8Unorm).unwrap();
        assert_eq!(pixels[0], Unorm4 { r: 3, g: 2, b: 1, a: 4 });
    }

    #[test]
    fn unknown_formats_are_refused() {
        let mapped = [0u8; 8];
        assert!(read_color_pixels(&mapped, 8, (1, 1), TextureFormat::Rg32Float).is_none());
    }
}

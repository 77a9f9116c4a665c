// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

/// Failures specific to the wgpu backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WgpuError {
    #[error("Can't create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("No such adapter: {0}")]
    NoSuchAdapter(#[from] wgpu::RequestAdapterError),
    #[error("Can't create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("Adapter lacks required features {0:?}")]
    MissingFeatures(wgpu::Features),
    #[error("Surface format {0:?} is not supported")]
    SurfaceFormat(wgpu::TextureFormat),
    #[error("Can't acquire surface texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("Device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("Can't map readback buffer: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("Device error: {0}")]
    Device(String),
}

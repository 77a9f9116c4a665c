// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0

/// The wgpu instance every backend object descends from.
#[derive(Debug)]
pub(super) struct EntryPoint(pub(super) wgpu::Instance);

impl EntryPoint {
    pub(super) fn new() -> Self {
        let descriptor = wgpu::InstanceDescriptor::from_env_or_default();
        EntryPoint(wgpu::Instance::new(&descriptor))
    }
}

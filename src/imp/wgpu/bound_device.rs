// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::imp::wgpu::entry_point::EntryPoint;
use crate::imp::wgpu::error::WgpuError;
use wgpu::{Features, Trace};

/// Features the bindless pipeline can't run without.
pub(super) fn required_features() -> Features {
    Features::TEXTURE_BINDING_ARRAY
        | Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
}

/// Features used when the adapter has them.
fn optional_features() -> Features {
    Features::INDIRECT_FIRST_INSTANCE
}

/// An adapter and the device opened on it.
#[derive(Debug)]
pub(super) struct BoundDevice {
    pub(super) adapter: wgpu::Adapter,
    pub(super) device: wgpu::Device,
    pub(super) queue: wgpu::Queue,
    pub(super) features: Features,
}

impl BoundDevice {
    pub(super) async fn bind(
        entry_point: &EntryPoint,
        compatible_surface: Option<&wgpu::Surface<'static>>,
    ) -> Result<Self, WgpuError> {
        let options = wgpu::RequestAdapterOptions {
            power_preference: Default::default(),
            force_fallback_adapter: false,
            compatible_surface,
        };
        let adapter = entry_point.0.request_adapter(&options).await?;
        let info = adapter.get_info();
        logwise::info_sync!(
            "wgpu adapter {name} ({backend})",
            name = logwise::privacy::LogIt(&info.name),
            backend = logwise::privacy::LogIt(&info.backend)
        );

        let available = adapter.features();
        let required = required_features();
        if !available.contains(required) {
            let missing = required.difference(available);
            logwise::error_sync!(
                "adapter lacks bindless features {missing}",
                missing = logwise::privacy::LogIt(&missing)
            );
            return Err(WgpuError::MissingFeatures(missing));
        }
        let features = required | (optional_features() & available);

        let descriptor = wgpu::DeviceDescriptor {
            label: Some("bindless multidraw device"),
            required_features: features,
            //residency is bounded by the binding array limits, so ask for everything
            required_limits: adapter.limits(),
            memory_hints: Default::default(),
            trace: Trace::Off,
        };
        let (device, queue) = adapter.request_device(&descriptor).await?;
        device.on_uncaptured_error(Box::new(|error| {
            logwise::error_sync!(
                "uncaptured wgpu error {error}",
                error = logwise::privacy::LogIt(&error)
            );
        }));
        Ok(BoundDevice {
            adapter,
            device,
            queue,
            features,
        })
    }

    pub(super) fn has_first_instance(&self) -> bool {
        self.features.contains(Features::INDIRECT_FIRST_INSTANCE)
    }

    /// Runs `f` inside a validation error scope and returns any error it raised.
    pub(super) fn validation_scope<R>(&self, f: impl FnOnce(&wgpu::Device) -> R) -> (R, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let r = f(&self.device);
        let error = test_executors::spin_on(self.device.pop_error_scope());
        (r, error)
    }

    pub(super) fn wait(&self) -> Result<(), WgpuError> {
        self.device.poll(wgpu::PollType::Wait)?;
        Ok(())
    }
}

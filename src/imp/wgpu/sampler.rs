use crate::bindings::sampler::{FilterMode, SamplerDescriptor, WrapMode};
use wgpu::AddressMode;

/// Index of a descriptor's sampler within [`Samplers`], and the low two bits of a handle's
/// high word.
pub(super) const fn sampler_index(descriptor: SamplerDescriptor) -> u32 {
    let wrap = match descriptor.wrap {
        WrapMode::Repeat => 0,
        WrapMode::Clamp => 1,
    };
    let filter = match descriptor.filter {
        FilterMode::Nearest => 0,
        FilterMode::Linear => 1,
    };
    wrap * 2 + filter
}

/// One sampler per enumerated sampling state, bound once next to the texture array.
#[derive(Debug)]
pub(super) struct Samplers {
    pub(super) samplers: [wgpu::Sampler; 4],
}

impl Samplers {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let make = |wrap: WrapMode, filter: FilterMode| {
            let address_mode = match wrap {
                WrapMode::Repeat => AddressMode::Repeat,
                WrapMode::Clamp => AddressMode::ClampToEdge,
            };
            let filter_mode = match filter {
                FilterMode::Nearest => wgpu::FilterMode::Nearest,
                FilterMode::Linear => wgpu::FilterMode::Linear,
            };
            let s = wgpu::SamplerDescriptor {
                label: None,
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                address_mode_w: address_mode,
                mag_filter: filter_mode,
                min_filter: filter_mode,
                //bindless textures have a single mip level
                mipmap_filter: wgpu::FilterMode::Nearest,
                lod_min_clamp: 0.0,
                lod_max_clamp: 0.0,
                compare: None,
                anisotropy_clamp: 1,
                border_color: None,
            };
            device.create_sampler(&s)
        };
        Samplers {
            samplers: [
                make(WrapMode::Repeat, FilterMode::Nearest),
                make(WrapMode::Repeat, FilterMode::Linear),
                make(WrapMode::Clamp, FilterMode::Nearest),
                make(WrapMode::Clamp, FilterMode::Linear),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_shader_switch() {
        assert_eq!(sampler_index(SamplerDescriptor::new(WrapMode::Repeat, FilterMode::Nearest)), 0);
        assert_eq!(sampler_index(SamplerDescriptor::default()), 1);
        assert_eq!(sampler_index(SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Nearest)), 2);
        assert_eq!(sampler_index(SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Linear)), 3);
    }
}

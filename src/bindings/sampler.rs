// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Sampling parameters for bindless textures.

Each resident texture carries its own sampling state, so there is no shared sampler
binding.  The enumerated space is deliberately small: {repeat, clamp} x {nearest, linear}.
*/

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Coordinates wrap around.
    #[default]
    Repeat,
    /// Coordinates are clamped to the edge texel.
    Clamp,
}

/// How texels are combined when sampling between texel centers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    /// Bilinear interpolation of the four nearest texels.
    #[default]
    Linear,
}

/// Complete sampling state for one texture.
///
/// The default is repeat + linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

impl SamplerDescriptor {
    pub const fn new(wrap: WrapMode, filter: FilterMode) -> Self {
        Self { wrap, filter }
    }

    /// Resolves an integer texel coordinate against an axis of `size` texels.
    pub(crate) fn wrap_coord(&self, coord: i64, size: u32) -> u32 {
        let size = size as i64;
        match self.wrap {
            WrapMode::Repeat => coord.rem_euclid(size) as u32,
            WrapMode::Clamp => coord.clamp(0, size - 1) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_grid_textures() {
        let s = SamplerDescriptor::default();
        assert_eq!(s.wrap, WrapMode::Repeat);
        assert_eq!(s.filter, FilterMode::Linear);
    }

    #[test]
    fn wrap_modes() {
        let repeat = SamplerDescriptor::new(WrapMode::Repeat, FilterMode::Nearest);
        assert_eq!(repeat.wrap_coord(-1, 4), 3);
        assert_eq!(repeat.wrap_coord(5, 4), 1);
        let clamp = SamplerDescriptor::new(WrapMode::Clamp, FilterMode::Nearest);
        assert_eq!(clamp.wrap_coord(-1, 4), 0);
        assert_eq!(clamp.wrap_coord(5, 4), 3);
    }
}

/*!
bit packing.

Handles cross the host/shader boundary as 64-bit values, but WGSL has no 64-bit
integers, so the shader sees each handle as a `vec2<u32>` (low word first).
*/

pub fn u64_to_u32s(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, (packed & 0xFFFF_FFFF) as u32)
}

pub fn u32s_to_u64(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | (low as u64)
}

/// Finalizer from splitmix64; used to make handle values look as opaque as they are.
pub fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join() {
        let v = 0x0123_4567_89AB_CDEF;
        let (high, low) = u64_to_u32s(v);
        assert_eq!(high, 0x0123_4567);
        assert_eq!(low, 0x89AB_CDEF);
        assert_eq!(u32s_to_u64(high, low), v);
    }

    #[test]
    fn mix_is_not_identity() {
        assert_ne!(mix64(1), 1);
        assert_ne!(mix64(1), mix64(2));
    }
}

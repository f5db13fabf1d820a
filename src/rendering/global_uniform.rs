use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Per-frame constant block the lit shaders read besides the instance data.
/// Its contents are opaque to the instancing code; it is only bound once per frame.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BatchGlobals {
    pub probes_occlusion: Vec4,
    pub spec_cube0_hdr: Vec4,
    pub spec_cube1_hdr: Vec4,
    pub sh_coefficients: [Vec4; 7],
}

impl Default for BatchGlobals {
    fn default() -> Self {
        Self {
            probes_occlusion: Vec4::ONE,
            spec_cube0_hdr: Vec4::new(1.0, 1.0, 0.0, 0.0),
            spec_cube1_hdr: Vec4::new(1.0, 1.0, 0.0, 0.0),
            sh_coefficients: [Vec4::ZERO; 7],
        }
    }
}

impl BatchGlobals {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_float4_packed() {
        assert_eq!(std::mem::size_of::<BatchGlobals>(), 10 * 16);
        assert_eq!(BatchGlobals::default().as_bytes().len(), 160);
    }
}

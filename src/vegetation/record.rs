//! Per-instance attribute record written by the vegetation kernel.

use bytemuck::{Pod, Zeroable};

/// One rendered blade or flower (48 bytes, 16-byte aligned).
///
/// Must match `VegetationInstance` in vegetation.wgsl. WGSL aligns the
/// struct to 16 bytes, so the 40 bytes of payload are padded to 48.
/// The host only ever zero-initializes these; the kernel overwrites every
/// field every tick.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct VegetationInstance {
    /// Local position on the vegetation grid (offset 0)
    pub position: [f32; 3],
    /// Per-instance noise sample (offset 12)
    pub noise: f32,
    // -- 16 bytes --
    /// Wind displacement already scaled by strength (offset 16)
    pub wind: [f32; 3],
    /// Facing angle around Y in radians (offset 28)
    pub angle: f32,
    // -- 16 bytes --
    /// UV of the instance root on the height field (offset 32)
    pub ground_uv: [f32; 2],
    pub _pad: [f32; 2],
    // -- 16 bytes --
    // Total: 48 bytes
}

/// Stride of one record in the GPU instance buffer.
pub const INSTANCE_STRIDE: u64 = std::mem::size_of::<VegetationInstance>() as u64;

/// Byte size of a buffer holding `count` records.
pub fn instance_buffer_size(count: u32) -> u64 {
    count as u64 * INSTANCE_STRIDE
}

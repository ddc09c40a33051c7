//! GPU-ready vegetation kernel uniform (48 bytes, 16-byte aligned).

use bytemuck::{Pod, Zeroable};

use super::layout::GridLayout;
use crate::atmosphere::WindState;

/// Per-tick inputs to a vegetation tick that are not owned by the simulator.
#[derive(Clone, Copy, Debug)]
pub struct TickInputs {
    /// Seconds since start
    pub time: f32,
    /// Wind snapshot for this tick
    pub wind: WindState,
}

/// Uniform for the vegetation kernel. Must match `VegetationParams` in vegetation.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VegetationParams {
    /// Instance count; the kernel discards invocations at or past it
    pub amount: u32,
    /// `floor(sqrt(amount))`
    pub amount_per_row: u32,
    pub density: f32,
    pub noise_scale: f32,
    // -- 16 bytes --
    /// `(cos θ, 0, sin θ, 0)`, unscaled
    pub wind_direction: [f32; 4],
    // -- 16 bytes --
    pub wind_strength: f32,
    pub time: f32,
    pub _pad: [f32; 2],
    // -- 16 bytes --
    // Total: 48 bytes
}

impl VegetationParams {
    pub fn new(layout: GridLayout, density: f32, noise_scale: f32, inputs: &TickInputs) -> Self {
        let wind = inputs.wind.sanitized();
        Self {
            amount: layout.amount,
            amount_per_row: layout.amount_per_row,
            density,
            noise_scale,
            wind_direction: wind.direction_uniform(),
            wind_strength: wind.strength,
            time: inputs.time,
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_size() {
        assert_eq!(std::mem::size_of::<VegetationParams>(), 48);
        assert_eq!(std::mem::size_of::<VegetationParams>() % 16, 0);
        assert_eq!(std::mem::offset_of!(VegetationParams, wind_direction), 16);
        assert_eq!(std::mem::offset_of!(VegetationParams, wind_strength), 32);
    }

    #[test]
    fn test_params_from_inputs() {
        let inputs = TickInputs {
            time: 2.5,
            wind: WindState::new(90.0, 3.0),
        };
        let p = VegetationParams::new(GridLayout::new(900), 1.5, 0.1, &inputs);
        assert_eq!(p.amount, 900);
        assert_eq!(p.amount_per_row, 30);
        assert_eq!(p.wind_strength, 3.0);
        assert_eq!(p.time, 2.5);
        assert!(p.wind_direction[0].abs() < 1e-6);
        assert!((p.wind_direction[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_strength_never_reaches_kernel() {
        let inputs = TickInputs {
            time: 0.0,
            wind: WindState { direction_degrees: 0.0, strength: -1.0 },
        };
        let p = VegetationParams::new(GridLayout::new(4), 1.0, 1.0, &inputs);
        assert_eq!(p.wind_strength, 0.0);
    }
}

//! Wind state shared read-only by every vegetation simulator.

use serde::{Deserialize, Serialize};

/// Designer-facing wind: a heading on the XZ plane and a strength.
///
/// Vegetation simulators receive a snapshot of this every tick; nothing in
/// the pipeline mutates it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindState {
    /// Heading in degrees, `[-180, 180]`. 0 points down +X, 90 down +Z.
    pub direction_degrees: f32,
    /// Strength, `>= 0`.
    pub strength: f32,
}

impl Default for WindState {
    fn default() -> Self {
        Self {
            direction_degrees: 90.0,
            strength: 1.0,
        }
    }
}

impl WindState {
    pub fn new(direction_degrees: f32, strength: f32) -> Self {
        Self { direction_degrees, strength }.sanitized()
    }

    /// Wrap the heading into `[-180, 180]` and clamp strength to `>= 0`.
    /// Non-finite input falls back to the default wind.
    pub fn sanitized(self) -> Self {
        if !self.direction_degrees.is_finite() || !self.strength.is_finite() {
            log::warn!(
                "Non-finite wind ({}, {}), using default",
                self.direction_degrees, self.strength
            );
            return Self::default();
        }

        let mut direction = (self.direction_degrees + 180.0).rem_euclid(360.0) - 180.0;
        // rem_euclid maps +180 to -180; keep the designer's value when it was exactly +180
        if direction == -180.0 && self.direction_degrees > 0.0 {
            direction = 180.0;
        }

        Self {
            direction_degrees: direction,
            strength: self.strength.max(0.0),
        }
    }

    /// Unit horizontal direction `(cos θ, 0, sin θ)`. Not scaled by strength;
    /// kernels multiply by `wind_strength` themselves.
    pub fn direction_vector(&self) -> glam::Vec3 {
        let theta = self.direction_degrees.to_radians();
        glam::Vec3::new(theta.cos(), 0.0, theta.sin())
    }

    /// Direction padded to a `vec4` for the kernel uniform.
    pub fn direction_uniform(&self) -> [f32; 4] {
        self.direction_vector().extend(0.0).to_array()
    }
}

//! First-person look for the agent

use glam::{Quat, Vec3};

use crate::core::camera::Camera;

/// Mouse look: yaw turns the body, pitch only tilts the view.
pub struct FirstPersonLook {
    /// Radians per pixel of mouse motion, scaled by 0.001
    pub sensitivity: f32,
    /// Current yaw (rotation around Y axis) in radians
    yaw: f32,
    /// Current pitch (rotation around X axis) in radians
    pitch: f32,
}

impl FirstPersonLook {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Turn by a mouse delta in pixels. Pitch is clamped to straight up/down.
    pub fn turn(&mut self, delta: (f32, f32)) {
        self.yaw -= delta.0 * self.sensitivity * 0.001;
        self.pitch -= delta.1 * self.sensitivity * 0.001;
        self.pitch = self.pitch.clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
    }

    /// Set initial orientation from angles (in radians)
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Horizontal movement basis `(right, forward)` from yaw alone.
    pub fn basis(&self) -> (Vec3, Vec3) {
        let rotation = Quat::from_rotation_y(self.yaw);
        (rotation * Vec3::X, rotation * Vec3::NEG_Z)
    }

    /// Place `camera` at `eye` looking along the current yaw and pitch.
    pub fn apply(&self, camera: &mut Camera, eye: Vec3) {
        camera.position = eye;
        camera.set_rotation_euler(self.yaw, self.pitch);
    }
}

impl Default for FirstPersonLook {
    fn default() -> Self {
        Self::new(1.5)
    }
}

//! Grounded/airborne motion integration.
//!
//! The controller moves a [`KinematicBody`] once per tick. Horizontal input
//! is always applied. Vertical motion has two modes:
//!
//! - height-field mode, when a surface height is available under the agent:
//!   a grounded agent is snapped onto the surface, an airborne one integrates
//!   gravity until it reaches it again;
//! - fallback mode, when no height could be read this tick: gravity is
//!   integrated and the body's own collision decides whether it is grounded.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One tick of agent input: two axes in `[-1, 1]` and a jump edge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AgentInput {
    pub horizontal: f32,
    pub forward: f32,
    pub jump: bool,
}

/// Tuning for the motion controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Horizontal speed, units per second
    pub speed: f32,
    /// Vertical acceleration, negative is down
    pub gravity: f32,
    /// Apex height of a jump
    pub jump_height: f32,
    /// Height error under which the agent counts as on the surface
    pub grounded_threshold: f32,
    /// Small downward velocity held while grounded to keep contact
    pub stick_velocity: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 12.0,
            gravity: -19.62,
            jump_height: 3.0,
            grounded_threshold: 0.1,
            stick_velocity: -2.0,
        }
    }
}

impl MotionConfig {
    /// Launch velocity reaching `jump_height`: `sqrt(2 h |g|)`.
    pub fn jump_velocity(&self) -> f32 {
        (2.0 * self.jump_height.max(0.0) * self.gravity.abs()).sqrt()
    }
}

/// Upright capsule around the agent's pivot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleShape {
    pub height: f32,
    /// Capsule center relative to the pivot
    pub center_y: f32,
}

impl Default for CapsuleShape {
    fn default() -> Self {
        Self {
            height: 2.0,
            center_y: 0.0,
        }
    }
}

impl CapsuleShape {
    /// Distance from the pivot down to the feet.
    pub fn feet_offset(&self) -> f32 {
        self.height * 0.5 - self.center_y
    }

    /// Eye height above the pivot, just under the top of the capsule.
    pub fn eye_offset(&self) -> f32 {
        self.center_y + self.height * 0.5 - 0.1
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionState {
    Grounded,
    Airborne,
}

/// Something the controller can move, with its own notion of ground
/// contact used in fallback mode.
pub trait KinematicBody {
    /// Pivot position
    fn position(&self) -> Vec3;

    fn move_by(&mut self, delta: Vec3);

    /// Whether the last downward move ended in contact with the ground.
    fn is_grounded(&self) -> bool;
}

/// Body colliding with an infinite horizontal plane, or with nothing.
#[derive(Clone, Debug)]
pub struct PlaneBody {
    position: Vec3,
    feet_offset: f32,
    ground_y: Option<f32>,
    grounded: bool,
}

impl PlaneBody {
    pub fn new(position: Vec3, feet_offset: f32, ground_y: Option<f32>) -> Self {
        let grounded = ground_y.is_some_and(|g| position.y - feet_offset <= g);
        Self {
            position,
            feet_offset,
            ground_y,
            grounded,
        }
    }

    pub fn feet_y(&self) -> f32 {
        self.position.y - self.feet_offset
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }
}

impl KinematicBody for PlaneBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        match self.ground_y {
            Some(ground) if self.feet_y() <= ground && delta.y <= 0.0 => {
                self.position.y = ground + self.feet_offset;
                self.grounded = true;
            }
            _ if delta.y != 0.0 => self.grounded = false,
            _ => {}
        }
    }

    fn is_grounded(&self) -> bool {
        self.grounded
    }
}

/// Per-tick state machine moving an agent over a height field.
#[derive(Clone, Debug)]
pub struct GroundedMotionController {
    config: MotionConfig,
    feet_offset: f32,
    vertical_velocity: f32,
    state: MotionState,
    /// Feet ended the last height-field tick on or above the surface
    above_surface: bool,
}

impl GroundedMotionController {
    pub fn new(config: MotionConfig, shape: &CapsuleShape) -> Self {
        Self {
            config,
            feet_offset: shape.feet_offset(),
            vertical_velocity: 0.0,
            state: MotionState::Airborne,
            above_surface: false,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_grounded(&self) -> bool {
        self.state == MotionState::Grounded
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn feet_offset(&self) -> f32 {
        self.feet_offset
    }

    /// Apply horizontal input along `right`/`forward`, flattened onto XZ.
    pub fn move_horizontal<B: KinematicBody>(
        &self,
        body: &mut B,
        input: &AgentInput,
        right: Vec3,
        forward: Vec3,
        dt: f32,
    ) {
        let wish = right * input.horizontal + forward * input.forward;
        let direction = Vec3::new(wish.x, 0.0, wish.z).normalize_or_zero();
        if direction != Vec3::ZERO {
            body.move_by(direction * self.config.speed * dt);
        }
    }

    /// Vertical half of a tick. `ground` is the surface height under the
    /// body, `None` when no height field could be read this tick.
    pub fn move_vertical<B: KinematicBody>(
        &mut self,
        body: &mut B,
        jump: bool,
        ground: Option<f32>,
        dt: f32,
    ) -> MotionState {
        match ground {
            Some(target) => self.follow_surface(body, jump, target, dt),
            None => self.fall_back(body, jump, dt),
        }
        self.state
    }

    /// Full tick: horizontal move, then sample the ground at the new
    /// position, then vertical motion.
    pub fn tick<B, F>(
        &mut self,
        body: &mut B,
        input: &AgentInput,
        right: Vec3,
        forward: Vec3,
        dt: f32,
        sample_ground: F,
    ) -> MotionState
    where
        B: KinematicBody,
        F: FnOnce(Vec3) -> Option<f32>,
    {
        self.move_horizontal(body, input, right, forward, dt);
        let ground = sample_ground(body.position());
        self.move_vertical(body, input.jump, ground, dt)
    }

    fn feet_y<B: KinematicBody>(&self, body: &B) -> f32 {
        body.position().y - self.feet_offset
    }

    fn follow_surface<B: KinematicBody>(&mut self, body: &mut B, jump: bool, target: f32, dt: f32) {
        let threshold = self.config.grounded_threshold;

        if self.state == MotionState::Grounded {
            if jump {
                // Takes priority over the snap; the agent leaves the surface
                self.launch(body, dt);
                return;
            }
            let error = target - self.feet_y(body);
            body.move_by(Vec3::new(0.0, error, 0.0));
            self.above_surface = true;
            if error.abs() < threshold {
                self.vertical_velocity = self.config.stick_velocity;
            } else {
                self.state = MotionState::Airborne;
            }
            return;
        }

        let was_above = self.above_surface || self.feet_y(body) >= target;
        self.vertical_velocity += self.config.gravity * dt;
        body.move_by(Vec3::new(0.0, self.vertical_velocity * dt, 0.0));

        let error = target - self.feet_y(body);
        // Within reach of the surface, or crossed it since the last tick.
        // Feet that were already under the surface keep falling.
        let crossed = was_above && error > 0.0;
        if error.abs() < threshold || crossed {
            body.move_by(Vec3::new(0.0, error, 0.0));
            self.vertical_velocity = self.config.stick_velocity;
            self.state = MotionState::Grounded;
            self.above_surface = true;
        } else {
            self.above_surface = error <= 0.0;
        }
    }

    fn fall_back<B: KinematicBody>(&mut self, body: &mut B, jump: bool, dt: f32) {
        self.above_surface = false;
        let grounded = body.is_grounded();
        if grounded && self.vertical_velocity < 0.0 {
            self.vertical_velocity = self.config.stick_velocity;
        }
        if !grounded {
            self.vertical_velocity += self.config.gravity * dt;
        }

        if jump && grounded {
            self.launch(body, dt);
            return;
        }

        body.move_by(Vec3::new(0.0, self.vertical_velocity * dt, 0.0));
        self.state = if body.is_grounded() {
            MotionState::Grounded
        } else {
            MotionState::Airborne
        };
    }

    fn launch<B: KinematicBody>(&mut self, body: &mut B, dt: f32) {
        self.vertical_velocity = self.config.jump_velocity();
        self.state = MotionState::Airborne;
        body.move_by(Vec3::new(0.0, self.vertical_velocity * dt, 0.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn controller(state: MotionState, threshold: f32) -> GroundedMotionController {
        let mut c = GroundedMotionController::new(
            MotionConfig { grounded_threshold: threshold, ..Default::default() },
            &CapsuleShape::default(),
        );
        c.state = state;
        c
    }

    #[test]
    fn test_jump_velocity() {
        let v = MotionConfig::default().jump_velocity();
        assert!((v - (3.0f32 * 2.0 * 19.62).sqrt()).abs() < 1e-3);
        assert!((v - 10.849).abs() < 1e-2);
    }

    #[test]
    fn test_feet_offset() {
        assert_eq!(CapsuleShape::default().feet_offset(), 1.0);
        assert_eq!(CapsuleShape { height: 1.8, center_y: 0.9 }.feet_offset(), 0.0);
    }

    #[test]
    fn test_small_error_stays_grounded() {
        let mut c = controller(MotionState::Grounded, 0.05);
        // Feet 0.03 below the surface
        let mut body = PlaneBody::new(Vec3::new(0.0, 0.97 + 5.0, 0.0), 1.0, None);
        let state = c.move_vertical(&mut body, false, Some(5.0), DT);
        assert_eq!(state, MotionState::Grounded);
        assert!((body.feet_y() - 5.0).abs() < 1e-5);
        assert_eq!(c.vertical_velocity(), -2.0);
    }

    #[test]
    fn test_small_error_lands_airborne_agent() {
        let mut c = controller(MotionState::Airborne, 0.05);
        c.vertical_velocity = 0.0;
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.03, 0.0), 1.0, None);
        assert_eq!(c.move_vertical(&mut body, false, Some(0.0), DT), MotionState::Grounded);
        assert!(body.feet_y().abs() < 1e-5);
    }

    #[test]
    fn test_large_error_is_airborne_and_accelerates_down() {
        let mut c = controller(MotionState::Airborne, 0.05);
        c.vertical_velocity = 0.0;
        // Feet 0.2 from the surface
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.2, 0.0), 1.0, None);

        let mut last = c.vertical_velocity();
        for _ in 0..3 {
            let state = c.move_vertical(&mut body, false, Some(0.0), DT);
            assert_eq!(state, MotionState::Airborne);
            assert!(c.vertical_velocity() < last);
            last = c.vertical_velocity();
        }
    }

    #[test]
    fn test_feet_under_surface_keep_falling() {
        let mut c = controller(MotionState::Airborne, 0.05);
        c.vertical_velocity = 0.0;
        // Feet 0.2 below the surface
        let mut body = PlaneBody::new(Vec3::new(0.0, 0.8, 0.0), 1.0, None);

        let mut last = c.vertical_velocity();
        for _ in 0..3 {
            let state = c.move_vertical(&mut body, false, Some(0.0), DT);
            assert_eq!(state, MotionState::Airborne);
            assert!(c.vertical_velocity() < last);
            last = c.vertical_velocity();
        }
        assert!(body.feet_y() < -0.2);
    }

    #[test]
    fn test_falling_through_surface_lands() {
        let mut c = controller(MotionState::Airborne, 0.05);
        c.vertical_velocity = -30.0;
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.3, 0.0), 1.0, None);

        // One tick moves the feet from 0.3 above to about 0.2 below
        assert_eq!(c.move_vertical(&mut body, false, Some(0.0), DT), MotionState::Grounded);
        assert!(body.feet_y().abs() < 1e-5);
        assert_eq!(c.vertical_velocity(), -2.0);
    }

    #[test]
    fn test_surface_rising_under_airborne_agent_lands() {
        let mut c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.0, 0.0), 1.0, None);
        c.move_vertical(&mut body, false, Some(0.0), DT);

        // Step up snaps and leaves the ground, then the next texel is higher still
        assert_eq!(c.move_vertical(&mut body, false, Some(0.5), DT), MotionState::Airborne);
        assert_eq!(c.move_vertical(&mut body, false, Some(1.0), DT), MotionState::Grounded);
        assert!((body.feet_y() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_grounded_large_error_snaps_then_leaves_ground() {
        let mut c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.2, 0.0), 1.0, None);
        assert_eq!(c.move_vertical(&mut body, false, Some(0.0), DT), MotionState::Airborne);
        assert!(body.feet_y().abs() < 1e-5);
    }

    #[test]
    fn test_jump_beats_ground_snap() {
        let mut c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.0, 0.0), 1.0, None);
        let state = c.move_vertical(&mut body, true, Some(0.0), DT);

        assert_eq!(state, MotionState::Airborne);
        assert!((c.vertical_velocity() - 10.849).abs() < 1e-2);
        assert!(body.feet_y() > 0.0);

        // Rises, then comes back down onto the surface
        let mut peak = body.feet_y();
        for _ in 0..240 {
            c.move_vertical(&mut body, false, Some(0.0), DT);
            peak = peak.max(body.feet_y());
        }
        assert_eq!(c.state(), MotionState::Grounded);
        assert!((peak - 3.0).abs() < 0.25, "peak {}", peak);
        assert!(body.feet_y().abs() < 1e-4);
    }

    #[test]
    fn test_airborne_cannot_jump() {
        let mut c = controller(MotionState::Airborne, 0.1);
        c.vertical_velocity = 0.0;
        let mut body = PlaneBody::new(Vec3::new(0.0, 11.0, 0.0), 1.0, None);
        c.move_vertical(&mut body, true, Some(0.0), DT);
        assert!(c.vertical_velocity() < 0.0);
    }

    #[test]
    fn test_fallback_falls_and_lands_on_collider() {
        let mut c = controller(MotionState::Airborne, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 3.0, 0.0), 1.0, Some(0.0));
        for _ in 0..120 {
            c.move_vertical(&mut body, false, None, DT);
        }
        assert_eq!(c.state(), MotionState::Grounded);
        assert!(body.feet_y().abs() < 1e-5);
        assert_eq!(c.vertical_velocity(), -2.0);
    }

    #[test]
    fn test_fallback_without_collider_keeps_falling() {
        let mut c = controller(MotionState::Airborne, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 3.0, 0.0), 1.0, None);
        c.move_vertical(&mut body, false, None, DT);
        let v1 = c.vertical_velocity();
        c.move_vertical(&mut body, false, None, DT);
        assert!(c.vertical_velocity() < v1);
        assert_eq!(c.state(), MotionState::Airborne);
    }

    #[test]
    fn test_fallback_jump() {
        let mut c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.0, 0.0), 1.0, Some(0.0));
        assert!(body.is_grounded());
        c.move_vertical(&mut body, true, None, DT);
        assert_eq!(c.state(), MotionState::Airborne);
        assert!(body.feet_y() > 0.0);
    }

    #[test]
    fn test_horizontal_is_normalized() {
        let c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::ZERO, 1.0, None);
        let input = AgentInput { horizontal: 1.0, forward: 1.0, jump: false };
        c.move_horizontal(&mut body, &input, Vec3::X, Vec3::NEG_Z, 1.0);

        let moved = body.position();
        assert!((moved.length() - 12.0).abs() < 1e-4);
        assert_eq!(moved.y, 0.0);
        assert!(moved.x > 0.0 && moved.z < 0.0);
    }

    #[test]
    fn test_no_input_no_horizontal_move() {
        let c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::new(1.0, 2.0, 3.0), 1.0, None);
        c.move_horizontal(&mut body, &AgentInput::default(), Vec3::X, Vec3::NEG_Z, DT);
        assert_eq!(body.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_tick_samples_after_horizontal_move() {
        let mut c = controller(MotionState::Grounded, 0.1);
        let mut body = PlaneBody::new(Vec3::new(0.0, 1.0, 0.0), 1.0, None);
        let input = AgentInput { horizontal: 1.0, forward: 0.0, jump: false };
        let mut sampled_at = Vec3::ZERO;
        c.tick(&mut body, &input, Vec3::X, Vec3::NEG_Z, 0.5, |p| {
            sampled_at = p;
            Some(0.05)
        });
        assert!((sampled_at.x - 6.0).abs() < 1e-4);
        assert_eq!(c.state(), MotionState::Grounded);
        assert!((body.feet_y() - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let cfg: MotionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, MotionConfig::default());
        let shape: CapsuleShape = serde_json::from_str(r#"{"height": 1.8}"#).unwrap();
        assert_eq!(shape.center_y, 0.0);
    }
}

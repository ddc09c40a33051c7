//! Input state tracking

use std::collections::HashSet;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::agent::AgentInput;

/// Tracks keyboard and mouse input state
pub struct InputState {
    /// Currently pressed keys
    keys_pressed: HashSet<KeyCode>,
    /// Keys pressed this frame
    keys_just_pressed: HashSet<KeyCode>,
    /// Raw mouse motion accumulated since the last frame
    mouse_delta_accumulated: (f32, f32),
    /// Mouse motion of the last completed frame
    mouse_delta: (f32, f32),
    /// Whether mouse is captured
    mouse_captured: bool,
}

impl InputState {
    /// Create new input state
    pub fn new() -> Self {
        Self {
            keys_pressed: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            mouse_delta_accumulated: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            mouse_captured: false,
        }
    }

    /// Process a window event
    pub fn process_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(key_code),
                state,
                ..
            },
            ..
        } = event
        {
            match state {
                ElementState::Pressed => {
                    if !self.keys_pressed.contains(key_code) {
                        self.keys_just_pressed.insert(*key_code);
                    }
                    self.keys_pressed.insert(*key_code);
                }
                ElementState::Released => {
                    self.keys_pressed.remove(key_code);
                }
            }
        }
    }

    /// Process device event for raw mouse motion (when cursor is grabbed)
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        if self.mouse_captured {
            self.mouse_delta_accumulated.0 += delta.0 as f32;
            self.mouse_delta_accumulated.1 += delta.1 as f32;
        }
    }

    /// Call at end of frame to reset per-frame state
    pub fn end_frame(&mut self) {
        self.keys_just_pressed.clear();
        self.mouse_delta = self.mouse_delta_accumulated;
        self.mouse_delta_accumulated = (0.0, 0.0);
    }

    /// Check if key is currently pressed
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if key was just pressed this frame
    pub fn is_key_just_pressed(&self, key: KeyCode) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    /// Get mouse delta of the last frame
    pub fn mouse_delta(&self) -> (f32, f32) {
        self.mouse_delta
    }

    /// Set mouse captured state
    pub fn set_mouse_captured(&mut self, captured: bool) {
        self.mouse_captured = captured;
        self.mouse_delta = (0.0, 0.0);
        self.mouse_delta_accumulated = (0.0, 0.0);
    }

    /// Check if mouse is captured
    pub fn is_mouse_captured(&self) -> bool {
        self.mouse_captured
    }

    /// Poll the agent's input surface: two axes in [-1, 1] and the jump edge.
    pub fn agent_input(&self) -> AgentInput {
        let axis = |pos: &[KeyCode], neg: &[KeyCode]| -> f32 {
            let p = pos.iter().any(|k| self.is_key_pressed(*k));
            let n = neg.iter().any(|k| self.is_key_pressed(*k));
            f32::from(u8::from(p)) - f32::from(u8::from(n))
        };

        AgentInput {
            horizontal: axis(&[KeyCode::KeyD, KeyCode::ArrowRight], &[KeyCode::KeyA, KeyCode::ArrowLeft]),
            forward: axis(&[KeyCode::KeyW, KeyCode::ArrowUp], &[KeyCode::KeyS, KeyCode::ArrowDown]),
            jump: self.is_key_just_pressed(KeyCode::Space),
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

//! Agent motion over the height field

pub mod motion;
pub use motion::{
    AgentInput, CapsuleShape, GroundedMotionController, KinematicBody, MotionConfig, MotionState, PlaneBody,
};

pub mod look;
pub use look::FirstPersonLook;

pub mod rig;
pub use rig::Agent;

//! An agent: body, motion controller, ground sampler and look, ticked together.

use glam::Vec3;

use crate::terrain::height_field::HeightFieldSource;
use crate::terrain::sampler::{HeightFieldSampler, TerrainFootprint};

use super::look::FirstPersonLook;
use super::motion::{
    AgentInput, CapsuleShape, GroundedMotionController, KinematicBody, MotionConfig, MotionState,
};

pub struct Agent<B, S> {
    body: B,
    shape: CapsuleShape,
    controller: GroundedMotionController,
    sampler: HeightFieldSampler<S>,
    look: FirstPersonLook,
}

impl<B: KinematicBody, S> Agent<B, S> {
    pub fn new(body: B, shape: CapsuleShape, motion: MotionConfig, footprint: TerrainFootprint) -> Self {
        let controller = GroundedMotionController::new(motion, &shape);
        let sampler = HeightFieldSampler::new(footprint, shape.feet_offset());
        Self {
            body,
            shape,
            controller,
            sampler,
            look: FirstPersonLook::default(),
        }
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    /// Eye position for a first-person camera
    pub fn eye(&self) -> Vec3 {
        self.body.position() + Vec3::Y * self.shape.eye_offset()
    }

    pub fn controller(&self) -> &GroundedMotionController {
        &self.controller
    }

    pub fn sampler(&self) -> &HeightFieldSampler<S> {
        &self.sampler
    }

    pub fn look(&self) -> &FirstPersonLook {
        &self.look
    }

    pub fn look_mut(&mut self) -> &mut FirstPersonLook {
        &mut self.look
    }

    /// One tick. The height field is read once, under the agent's position
    /// after the horizontal move. Without a readable field the body's own
    /// collision grounds the agent.
    pub fn tick<H>(&mut self, input: &AgentInput, dt: f32, height_field: Option<&H>) -> MotionState
    where
        H: HeightFieldSource<Staging = S>,
    {
        let (right, forward) = self.look.basis();
        let sampler = &mut self.sampler;
        self.controller.tick(&mut self.body, input, right, forward, dt, |position| {
            sampler.try_sample(position, height_field)
        })
    }
}

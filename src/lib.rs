//! Meadow - GPU-driven grass and flowers over a procedural height field

pub mod core;
pub mod atmosphere;
pub mod terrain;
pub mod vegetation;
pub mod agent;
pub mod render;
pub mod scene;
pub mod frame;

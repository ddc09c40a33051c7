//! Render and compute pipelines

pub mod terrain_height;
pub mod vegetation;
pub mod vegetation_draw;
pub mod ground;

pub use terrain_height::{TerrainHeightParams, TerrainHeightPipeline};
pub use vegetation::VegetationComputePipeline;
pub use vegetation_draw::{DrawParams, VegetationDrawPipeline, DEPTH_FORMAT};
pub use ground::GroundPipeline;

//! Terrain height field: generation, storage, and point queries

pub mod height_field;
pub use height_field::{HeightField, HeightFieldSource, HeightFormat, HeightResolution};

pub mod sampler;
pub use sampler::{HeightFieldSampler, ReadbackStatus, TerrainFootprint};

pub mod texture;
pub use texture::{GpuHeightSource, HeightFieldTexture, HEIGHT_FIELD_FORMAT};

pub mod generator;
pub use generator::TerrainHeightGenerator;

pub mod procedural;
pub use procedural::{generate_cpu, TerrainNoise, TerrainParams};

//! GPU-driven vegetation instancing
//!
//! Each class (grass, flowers) owns an instance buffer that a compute kernel
//! rewrites every tick and an indirect argument buffer the draw reads.

pub mod config;
pub mod indirect;
pub mod layout;
pub mod mesh;
pub mod params;
pub mod record;
pub mod simulator;

pub use config::{VegetationClass, VegetationConfig};
pub use indirect::{build_indirect_args, DrawIndexedIndirectArgs, IndirectArgsBuffer};
pub use layout::{amount_per_row, max_instances, GridLayout, VEGETATION_WORKGROUP_SIZE};
pub use mesh::{GpuMesh, MeshData, MeshMetadata, MeshVertex, SubMesh};
pub use params::{TickInputs, VegetationParams};
pub use record::VegetationInstance;
pub use simulator::VegetationFieldSimulator;

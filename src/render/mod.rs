//! Rendering system and GPU interfaces

pub mod context;
pub mod buffer;
pub mod material;
pub mod pipeline;

pub use context::GpuContext;
pub use material::{Material, HEIGHT_FIELD_SLOT};

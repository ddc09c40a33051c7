//! Scene configuration

pub mod config;

pub use config::{AgentConfig, SceneConfig, TerrainConfig};

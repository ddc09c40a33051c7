//! Scene configuration loaded from JSON

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::agent::motion::{CapsuleShape, MotionConfig};
use crate::atmosphere::WindState;
use crate::core::types::Result;
use crate::terrain::height_field::HeightResolution;
use crate::terrain::procedural::TerrainParams;
use crate::terrain::sampler::TerrainFootprint;
use crate::vegetation::config::{VegetationClass, VegetationConfig};

/// Height field generation and placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub resolution: HeightResolution,
    pub footprint: TerrainFootprint,
    pub seed: u32,
    pub noise_scale: f32,
    pub octaves: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        let params = TerrainParams::default();
        Self {
            resolution: HeightResolution::default(),
            footprint: TerrainFootprint::default(),
            seed: params.seed,
            noise_scale: params.noise_scale,
            octaves: params.octaves,
        }
    }
}

impl TerrainConfig {
    pub fn params(&self) -> TerrainParams {
        TerrainParams {
            seed: self.seed,
            noise_scale: self.noise_scale,
            octaves: self.octaves,
            ..Default::default()
        }
    }
}

/// Agent tuning and spawn point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub motion: MotionConfig,
    pub capsule: CapsuleShape,
    /// Pivot position at startup
    pub spawn: Vec3,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            motion: MotionConfig::default(),
            capsule: CapsuleShape::default(),
            spawn: Vec3::new(500.0, 120.0, 500.0),
        }
    }
}

/// Everything a scene needs. Every field has a default, so a partial (or
/// empty) document is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub terrain: TerrainConfig,
    pub grass: VegetationConfig,
    pub flower: VegetationConfig,
    pub wind: WindState,
    pub agent: AgentConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            grass: VegetationConfig::grass(),
            flower: VegetationConfig::flower(),
            wind: WindState::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.normalize();
        Ok(config)
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Save to file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Each slot drives a fixed class; a document naming the wrong one is
    /// corrected rather than rejected.
    fn normalize(&mut self) {
        for (config, class) in [
            (&mut self.grass, VegetationClass::Grass),
            (&mut self.flower, VegetationClass::Flower),
        ] {
            if config.class != class {
                log::warn!("Scene config: {:?} slot declared {:?}, using {:?}", class, config.class, class);
                config.class = class;
            }
        }
        self.wind = self.wind.sanitized();
    }
}

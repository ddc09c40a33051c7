//! Vegetation class identity and per-class configuration.

use serde::{Deserialize, Serialize};

/// Kind of vegetation a simulator drives. Each class has its own kernel
/// entry point and its own buffer slot, so two classes never alias.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VegetationClass {
    Grass,
    Flower,
}

impl VegetationClass {
    /// Name under which the instance buffer is exposed to the shading stage.
    pub fn buffer_name(self) -> &'static str {
        match self {
            Self::Grass => "GrassBuffer",
            Self::Flower => "FlowerBuffer",
        }
    }

    /// Entry point in vegetation.wgsl.
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Grass => "grass_main",
            Self::Flower => "flower_main",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Flower => "flower",
        }
    }
}

/// Per-class settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    pub class: VegetationClass,
    /// Number of instances rendered
    pub instance_count: u32,
    /// Grid spacing multiplier handed to the kernel
    pub density: f32,
    /// Frequency of the per-instance noise
    pub noise_scale: f32,
    /// Submesh of the class mesh to draw
    pub submesh_index: usize,
}

impl VegetationConfig {
    pub fn grass() -> Self {
        Self {
            class: VegetationClass::Grass,
            instance_count: 900,
            density: 1.5,
            noise_scale: 0.1,
            submesh_index: 0,
        }
    }

    pub fn flower() -> Self {
        Self {
            class: VegetationClass::Flower,
            instance_count: 100,
            density: 1.0,
            noise_scale: 0.05,
            submesh_index: 0,
        }
    }
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self::grass()
    }
}

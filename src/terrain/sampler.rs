//! Point queries against a height field.
//!
//! Maps a world-space XZ position into height-field UV space, picks the
//! nearest texel and reads exactly that one texel back. The readback is
//! synchronous; call it once per agent per tick, never per instance.

use glam::{UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::height_field::{HeightFieldSource, HeightFormat};

/// Where the height field sits in the world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainFootprint {
    /// World position of the corner at UV (0, 0). Heights are measured from
    /// y = 0, not from `origin.y`.
    pub origin: Vec3,
    /// X = width, Y = max height, Z = length
    pub world_size: Vec3,
}

impl Default for TerrainFootprint {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            world_size: Vec3::new(1000.0, 100.0, 1000.0),
        }
    }
}

impl TerrainFootprint {
    /// UV of `world_position`, clamped into `[0, 1]` on both axes.
    ///
    /// A degenerate axis (zero or non-finite size) maps to 0.
    pub fn uv(&self, world_position: Vec3) -> Vec2 {
        let axis = |p: f32, o: f32, s: f32| -> f32 {
            let t = (p - o) / s;
            if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 }
        };
        Vec2::new(
            axis(world_position.x, self.origin.x, self.world_size.x),
            axis(world_position.z, self.origin.z, self.world_size.z),
        )
    }

    /// World-space height of a normalized sample.
    pub fn height_of(&self, normalized: f32) -> f32 {
        normalized * self.world_size.y
    }
}

/// Nearest texel for a clamped UV: `floor(uv * max(0, extent - 1))`.
pub fn texel_coord(uv: Vec2, width: u32, height: u32) -> UVec2 {
    let uv = uv.clamp(Vec2::ZERO, Vec2::ONE);
    let tx = (uv.x * width.saturating_sub(1) as f32).floor() as u32;
    let ty = (uv.y * height.saturating_sub(1) as f32).floor() as u32;
    UVec2::new(tx.min(width.saturating_sub(1)), ty.min(height.saturating_sub(1)))
}

/// State of the sampler's readback target after (re)initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadbackStatus {
    /// A target matching the bound field's format exists
    Ready,
    /// No height field is bound
    Unbound,
    /// A field is bound but its format cannot be read back
    Unsupported(wgpu::TextureFormat),
}

struct Readback<S> {
    source_format: wgpu::TextureFormat,
    format: HeightFormat,
    staging: S,
}

/// Height query used by the grounding controller.
///
/// Generic over the staging type of the [`HeightFieldSource`] it reads from.
pub struct HeightFieldSampler<S> {
    footprint: TerrainFootprint,
    feet_offset: f32,
    readback: Option<Readback<S>>,
    status: ReadbackStatus,
    allocations: u32,
}

impl<S> HeightFieldSampler<S> {
    pub fn new(footprint: TerrainFootprint, feet_offset: f32) -> Self {
        Self {
            footprint,
            feet_offset,
            readback: None,
            status: ReadbackStatus::Unbound,
            allocations: 0,
        }
    }

    pub fn footprint(&self) -> &TerrainFootprint {
        &self.footprint
    }

    pub fn set_footprint(&mut self, footprint: TerrainFootprint) {
        self.footprint = footprint;
    }

    pub fn feet_offset(&self) -> f32 {
        self.feet_offset
    }

    pub fn status(&self) -> ReadbackStatus {
        self.status
    }

    /// Number of readback targets allocated so far.
    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    /// (Re)initialize the readback target for `source`.
    ///
    /// No-op when the binding state and format are unchanged. Changing either
    /// releases the old target first.
    pub fn ensure_readback<H>(&mut self, source: Option<&H>) -> ReadbackStatus
    where
        H: HeightFieldSource<Staging = S>,
    {
        let Some(source) = source else {
            if self.status != ReadbackStatus::Unbound {
                log::warn!("Height field unbound, grounding falls back to collision");
            }
            self.readback = None;
            self.status = ReadbackStatus::Unbound;
            return self.status;
        };

        let source_format = source.texture_format();
        if let Some(rb) = &self.readback {
            if rb.source_format == source_format {
                return self.status;
            }
        }
        if self.status == ReadbackStatus::Unsupported(source_format) {
            return self.status;
        }

        self.readback = None;
        match HeightFormat::require(source_format) {
            Ok(format) => {
                let staging = source.create_staging(format);
                self.readback = Some(Readback { source_format, format, staging });
                self.allocations += 1;
                self.status = ReadbackStatus::Ready;
                log::debug!("Height readback target allocated for {:?}", source_format);
            }
            Err(e) => {
                log::warn!("{}, grounding falls back to collision", e);
                self.status = ReadbackStatus::Unsupported(source_format);
            }
        }
        self.status
    }

    /// World-space surface height under `world_position`, or `None` when no
    /// readable field is bound or the read failed this tick.
    pub fn try_sample<H>(&mut self, world_position: Vec3, source: Option<&H>) -> Option<f32>
    where
        H: HeightFieldSource<Staging = S>,
    {
        if self.ensure_readback(source) != ReadbackStatus::Ready {
            return None;
        }
        let source = source?;
        let rb = self.readback.as_mut()?;

        let (width, height) = source.extent();
        let uv = self.footprint.uv(world_position);
        let texel = texel_coord(uv, width, height);

        match source.read_red(&mut rb.staging, rb.format, texel.x, texel.y) {
            Ok(red) => Some(self.footprint.height_of(red)),
            Err(e) => {
                log::error!(
                    "Height readback at texel ({}, {}) failed: {}. Using current position",
                    texel.x, texel.y, e
                );
                None
            }
        }
    }

    /// Surface height under `world_position`. Falls back to
    /// `world_position.y - feet_offset` (trust the current position) when
    /// nothing can be read.
    pub fn sample<H>(&mut self, world_position: Vec3, source: Option<&H>) -> f32
    where
        H: HeightFieldSource<Staging = S>,
    {
        self.try_sample(world_position, source)
            .unwrap_or(world_position.y - self.feet_offset)
    }
}

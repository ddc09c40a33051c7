//! CPU reference height field using fractal Brownian motion (FBM)

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use super::height_field::{HeightField, HeightResolution};

/// Parameters controlling height generation
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainParams {
    pub seed: u32,
    pub noise_scale: f32, // Frequency over the [0, 1] UV square
    pub octaves: u32,     // FBM octaves (detail levels)
    pub persistence: f32, // FBM persistence (0.5 typical)
    pub lacunarity: f32,  // FBM lacunarity (2.0 typical)
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            noise_scale: 4.0,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Normalized height function over UV space
pub struct TerrainNoise {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainNoise {
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves.max(1) as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Height in `[0, 1]` at `(u, v)`
    pub fn height_at(&self, u: f32, v: f32) -> f32 {
        let nx = (u * self.params.noise_scale) as f64;
        let nz = (v * self.params.noise_scale) as f64;

        // Noise is roughly [-1, 1]
        let normalized = (self.noise.get([nx, nz]) + 1.0) * 0.5;
        (normalized as f32).clamp(0.0, 1.0)
    }
}

/// Fill a square height field on the CPU. Rows are generated in parallel.
pub fn generate_cpu(params: &TerrainParams, resolution: HeightResolution) -> HeightField {
    let noise = TerrainNoise::new(params.clone());
    let size = resolution.texels();
    let step = 1.0 / (size.saturating_sub(1).max(1)) as f32;

    let mut data = vec![0.0f32; size as usize * size as usize];
    data.par_chunks_mut(size as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let v = y as f32 * step;
            for (x, texel) in row.iter_mut().enumerate() {
                *texel = noise.height_at(x as f32 * step, v);
            }
        });

    HeightField::from_fn(size, size, |x, y| data[(y * size + x) as usize])
}

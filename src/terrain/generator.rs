//! GPU height field generation

use crate::render::pipeline::terrain_height::{TerrainHeightParams, TerrainHeightPipeline};

use super::height_field::HeightResolution;
use super::procedural::TerrainParams;
use super::texture::HeightFieldTexture;

/// What `generate` has to do with the existing texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureAction {
    /// First generation
    Create,
    /// Same resolution, dispatch into the existing storage
    Reuse,
    /// Resolution changed, release the old storage then create
    Recreate,
}

/// Decide the texture action for a request at `requested` texels per side.
pub fn plan_texture(current: Option<u32>, requested: u32) -> TextureAction {
    match current {
        None => TextureAction::Create,
        Some(size) if size == requested => TextureAction::Reuse,
        Some(_) => TextureAction::Recreate,
    }
}

/// Owns the height field texture and the kernel that fills it.
///
/// The texture is written only here, and only when `generate` runs. Every
/// other consumer reads it.
pub struct TerrainHeightGenerator {
    pipeline: TerrainHeightPipeline,
    params: TerrainHeightParams,
    texture: Option<HeightFieldTexture>,
    resolution: Option<HeightResolution>,
}

impl TerrainHeightGenerator {
    pub fn new(device: &wgpu::Device, params: &TerrainParams) -> Self {
        Self {
            pipeline: TerrainHeightPipeline::new(device),
            params: TerrainHeightParams {
                // Keep the noise domain offset small enough for f32 precision
                seed: (params.seed % 4096) as f32 * 17.0,
                noise_scale: params.noise_scale,
                octaves: params.octaves.max(1),
                _pad: 0,
            },
            texture: None,
            resolution: None,
        }
    }

    /// Fill a `resolution x resolution` height field and return it.
    ///
    /// May be called again with a different resolution; the old storage is
    /// released before the new one is allocated.
    pub fn generate(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resolution: HeightResolution,
    ) -> &HeightFieldTexture {
        let size = resolution.texels();
        let action = plan_texture(self.resolution.map(HeightResolution::texels), size);

        if action == TextureAction::Recreate {
            if let Some(old) = self.texture.take() {
                log::debug!("Releasing {}x{} height field", old.width(), old.height());
                drop(old);
            }
        }

        let texture = match self.texture.take() {
            Some(texture) => texture,
            None => HeightFieldTexture::new(device, size, size),
        };

        self.pipeline.update_params(queue, &self.params);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terrain_height_encoder"),
        });
        self.pipeline.dispatch(device, &mut encoder, &texture);
        queue.submit(std::iter::once(encoder.finish()));

        log::info!("Height field generated: {}x{} ({:?})", size, size, action);
        self.resolution = Some(resolution);
        self.texture.insert(texture)
    }

    /// The last generated field, if any
    pub fn height_field(&self) -> Option<&HeightFieldTexture> {
        self.texture.as_ref()
    }

    pub fn resolution(&self) -> Option<HeightResolution> {
        self.resolution
    }
}

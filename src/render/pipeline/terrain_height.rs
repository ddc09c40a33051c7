//! Terrain height compute pipeline

use bytemuck::{Pod, Zeroable};

use crate::terrain::texture::{HeightFieldTexture, HEIGHT_FIELD_FORMAT};

/// Threads per workgroup along X and Y. Must match terrain_height.wgsl.
pub const TERRAIN_WORKGROUP_SIZE: u32 = 8;

/// Optional shaping inputs for the terrain kernel. Resolution is implicit
/// in the output texture's dimensions.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct TerrainHeightParams {
    /// Offsets the noise domain
    pub seed: f32,
    /// Noise frequency in UV space
    pub noise_scale: f32,
    pub octaves: u32,
    pub _pad: u32,
}

impl Default for TerrainHeightParams {
    fn default() -> Self {
        Self {
            seed: 0.0,
            noise_scale: 4.0,
            octaves: 5,
            _pad: 0,
        }
    }
}

/// Compute pipeline writing one normalized height per texel.
pub struct TerrainHeightPipeline {
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl TerrainHeightPipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain_height_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/terrain_height.wgsl").into()),
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain_height_params"),
            size: std::mem::size_of::<TerrainHeightParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrain_height_layout"),
            entries: &[
                // Output height texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: HEIGHT_FIELD_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // Params
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain_height_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("terrain_height_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            params_buffer,
            bind_group_layout,
        }
    }

    /// Upload shaping params for the next dispatch
    pub fn update_params(&self, queue: &wgpu::Queue, params: &TerrainHeightParams) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
    }

    /// Record one dispatch covering every texel of `target`.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &HeightFieldTexture,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrain_height_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(target.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("terrain_height_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);

        let (x, y) = terrain_workgroups(target.width(), target.height());
        pass.dispatch_workgroups(x, y, 1);
    }
}

/// Workgroups covering a `width x height` texture.
pub fn terrain_workgroups(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(TERRAIN_WORKGROUP_SIZE),
        height.div_ceil(TERRAIN_WORKGROUP_SIZE),
    )
}

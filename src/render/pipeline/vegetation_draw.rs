//! Indirect instanced draw of vegetation, seated on the height field

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::render::material::{Material, HEIGHT_FIELD_SLOT};
use crate::terrain::sampler::TerrainFootprint;
use crate::terrain::texture::HEIGHT_FIELD_FORMAT;
use crate::vegetation::config::VegetationClass;
use crate::vegetation::mesh::MeshVertex;

/// Depth format shared by the vegetation and ground passes
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-class draw uniform. Must match `DrawParams` in vegetation_draw.wgsl
/// and ground.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawParams {
    /// xyz = world corner at height-field UV (0, 0)
    pub footprint_origin: [f32; 4],
    /// x = width, y = max height, z = length
    pub footprint_size: [f32; 4],
    /// xyz = world position of the instance grid's first cell
    pub grid_origin: [f32; 4],
    pub base_color: [f32; 4],
    pub tip_color: [f32; 4],
}

impl DrawParams {
    pub fn new(footprint: &TerrainFootprint, grid_origin: glam::Vec3, base_color: [f32; 4], tip_color: [f32; 4]) -> Self {
        Self {
            footprint_origin: footprint.origin.extend(0.0).to_array(),
            footprint_size: footprint.world_size.extend(0.0).to_array(),
            grid_origin: grid_origin.extend(0.0).to_array(),
            base_color,
            tip_color,
        }
    }
}

struct ClassBinding {
    params_buffer: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    revision: Option<u64>,
}

/// Single-texel zero height, bound when no height field is published.
pub(crate) fn flat_height_view(device: &wgpu::Device) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("flat_height_field"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HEIGHT_FIELD_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

pub(crate) fn height_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Draws each class's mesh once per instance, reading the class's instance
/// buffer and the height field out of the material.
pub struct VegetationDrawPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    flat_height: wgpu::TextureView,
    bindings: HashMap<VegetationClass, ClassBinding>,
}

impl VegetationDrawPipeline {
    pub fn new(
        device: &wgpu::Device,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vegetation_draw_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/vegetation_draw.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vegetation_draw_layout"),
            entries: &[
                // Instances, written by the compute pass
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                height_texture_entry(1),
                uniform_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vegetation_draw_pipeline_layout"),
            bind_group_layouts: &[camera_layout, &bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("vegetation_draw_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Blades are single-sided quads seen from both sides
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            flat_height: flat_height_view(device),
            bindings: HashMap::new(),
        }
    }

    /// Upload `params` for `class` and rebuild its bind group if the material
    /// changed. Returns whether the class can be drawn.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material: &Material,
        class: VegetationClass,
        params: &DrawParams,
    ) -> bool {
        let binding = self.bindings.entry(class).or_insert_with(|| ClassBinding {
            params_buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{}_draw_params", class.label())),
                size: std::mem::size_of::<DrawParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            bind_group: None,
            revision: None,
        });
        queue.write_buffer(&binding.params_buffer, 0, bytemuck::bytes_of(params));

        if binding.revision != Some(material.revision()) {
            binding.revision = Some(material.revision());
            binding.bind_group = material.buffer(class.buffer_name()).map(|instances| {
                let height = material.texture(HEIGHT_FIELD_SLOT).unwrap_or(&self.flat_height);
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{}_draw_bind_group", class.label())),
                    layout: &self.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: instances.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(height),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: binding.params_buffer.as_entire_binding(),
                        },
                    ],
                })
            });
        }

        binding.bind_group.is_some()
    }

    /// Set pipeline and bind groups for `class`. Returns `false` (and sets
    /// nothing) when the class has nothing published.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, camera: &wgpu::BindGroup, class: VegetationClass) -> bool {
        let Some(bind_group) = self.bindings.get(&class).and_then(|b| b.bind_group.as_ref()) else {
            return false;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera, &[]);
        pass.set_bind_group(1, bind_group, &[]);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_params_layout() {
        assert_eq!(std::mem::size_of::<DrawParams>(), 80);
        assert_eq!(std::mem::offset_of!(DrawParams, grid_origin), 32);
    }

    #[test]
    fn test_draw_params_from_footprint() {
        let fp = TerrainFootprint {
            origin: glam::Vec3::new(-5.0, 0.0, 2.0),
            world_size: glam::Vec3::new(10.0, 4.0, 20.0),
        };
        let p = DrawParams::new(&fp, glam::Vec3::ONE, [0.0; 4], [1.0; 4]);
        assert_eq!(p.footprint_origin, [-5.0, 0.0, 2.0, 0.0]);
        assert_eq!(p.footprint_size[1], 4.0);
        assert_eq!(p.grid_origin, [1.0, 1.0, 1.0, 0.0]);
    }
}

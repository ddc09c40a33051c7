//! Vegetation instance compute pipeline
//!
//! One shader module, one entry point per vegetation class. Both entry points
//! share the bind group layout: params uniform at binding 0, the class's
//! instance buffer at binding 1.

use crate::vegetation::config::VegetationClass;

pub struct VegetationComputePipeline {
    grass_pipeline: wgpu::ComputePipeline,
    flower_pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl VegetationComputePipeline {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vegetation_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/vegetation.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vegetation_compute_layout"),
            entries: &[
                // Params
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Instances
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vegetation_compute_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let create = |class: VegetationClass| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(class.entry_point()),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(class.entry_point()),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        Self {
            grass_pipeline: create(VegetationClass::Grass),
            flower_pipeline: create(VegetationClass::Flower),
            bind_group_layout,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        class: VegetationClass,
        params: &wgpu::Buffer,
        instances: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(class.buffer_name()),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instances.as_entire_binding(),
                },
            ],
        })
    }

    /// Record `workgroups` groups along X for `class`. Zero groups records
    /// nothing.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        class: VegetationClass,
        bind_group: &wgpu::BindGroup,
        workgroups: u32,
    ) {
        if workgroups == 0 {
            return;
        }

        let pipeline = match class {
            VegetationClass::Grass => &self.grass_pipeline,
            VegetationClass::Flower => &self.flower_pipeline,
        };

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(class.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(workgroups, 1, 1);
    }
}

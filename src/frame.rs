//! Per-frame orchestration: vegetation dispatches, then one render pass.
//!
//! Compute dispatches and draws are recorded into one encoder and submitted
//! together. The draws see the instance buffers the dispatches wrote because
//! work on one queue executes in submission order.

use glam::Vec3;

use crate::core::camera::Camera;
use crate::render::buffer::CameraBuffer;
use crate::render::material::{Material, HEIGHT_FIELD_SLOT};
use crate::render::pipeline::{
    DrawParams, GroundPipeline, VegetationComputePipeline, VegetationDrawPipeline, DEPTH_FORMAT,
};
use crate::scene::SceneConfig;
use crate::terrain::sampler::TerrainFootprint;
use crate::terrain::texture::HeightFieldTexture;
use crate::vegetation::{
    GpuMesh, MeshData, TickInputs, VegetationClass, VegetationConfig, VegetationFieldSimulator,
};

const SKY: wgpu::Color = wgpu::Color { r: 0.55, g: 0.72, b: 0.9, a: 1.0 };

struct VegetationLayer {
    simulator: VegetationFieldSimulator,
    mesh: Option<GpuMesh>,
    base_color: [f32; 4],
    tip_color: [f32; 4],
}

impl VegetationLayer {
    /// First cell of a grid centered on the footprint
    fn grid_origin(&self, footprint: &TerrainFootprint) -> Vec3 {
        let layout = self.simulator.layout();
        let extent = layout.amount_per_row as f32 * self.simulator.config().density;
        footprint.origin
            + Vec3::new(
                (footprint.world_size.x - extent) * 0.5,
                0.0,
                (footprint.world_size.z - extent) * 0.5,
            )
    }
}

fn create_depth(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Drives every vegetation class and draws them over the ground.
pub struct FramePipeline {
    compute: VegetationComputePipeline,
    draw: VegetationDrawPipeline,
    ground: GroundPipeline,
    ground_mesh: GpuMesh,
    camera: CameraBuffer,
    material: Material,
    layers: Vec<VegetationLayer>,
    footprint: TerrainFootprint,
    depth: wgpu::TextureView,
}

impl FramePipeline {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        size: (u32, u32),
        scene: &SceneConfig,
    ) -> Self {
        let camera = CameraBuffer::new(device);
        let compute = VegetationComputePipeline::new(device);
        let draw = VegetationDrawPipeline::new(device, camera.bind_group_layout(), color_format);
        let ground = GroundPipeline::new(device, camera.bind_group_layout(), color_format);
        let ground_mesh = GpuMesh::upload(device, "ground", &MeshData::ground_grid(255));

        let mut pipeline = Self {
            compute,
            draw,
            ground,
            ground_mesh,
            camera,
            material: Material::new(),
            layers: Vec::new(),
            footprint: scene.terrain.footprint,
            depth: create_depth(device, size.0, size.1),
        };

        pipeline.add_layer(
            device,
            queue,
            scene.grass.clone(),
            MeshData::grass_blade(4, 0.12, 1.0),
            [0.12, 0.32, 0.08, 1.0],
            [0.55, 0.78, 0.3, 1.0],
        );
        pipeline.add_layer(
            device,
            queue,
            scene.flower.clone(),
            MeshData::flower(6, 0.6, 0.12),
            [0.2, 0.45, 0.15, 1.0],
            [0.95, 0.85, 0.3, 1.0],
        );
        pipeline
    }

    fn add_layer(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        config: VegetationConfig,
        mesh: MeshData,
        base_color: [f32; 4],
        tip_color: [f32; 4],
    ) {
        let count = config.instance_count;
        let mesh = GpuMesh::upload(device, config.class.label(), &mesh);
        let mut simulator = VegetationFieldSimulator::new(device, config);
        simulator.configure(device, queue, &self.compute, count, Some(mesh.metadata()));

        self.layers.push(VegetationLayer {
            simulator,
            mesh: Some(mesh),
            base_color,
            tip_color,
        });
    }

    /// Publish the height field to the ground and vegetation draws.
    pub fn set_height_field(&mut self, field: Option<&HeightFieldTexture>) {
        match field {
            Some(field) => self.material.set_texture(HEIGHT_FIELD_SLOT, field.view()),
            None => self.material.clear_texture(HEIGHT_FIELD_SLOT),
        }
    }

    pub fn set_footprint(&mut self, footprint: TerrainFootprint) {
        self.footprint = footprint;
    }

    /// Change how many instances `class` renders. Storage is only
    /// reallocated when the count actually changes.
    pub fn set_instance_count(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, class: VegetationClass, count: u32) {
        for layer in self.layers.iter_mut().filter(|l| l.simulator.class() == class) {
            let mesh = layer.mesh.as_ref().map(|m| m.metadata());
            layer.simulator.configure(device, queue, &self.compute, count, mesh);
        }
    }

    /// Retune density and noise scale for `class` from the next frame on.
    pub fn set_shape(&mut self, class: VegetationClass, density: f32, noise_scale: f32) {
        for layer in self.layers.iter_mut().filter(|l| l.simulator.class() == class) {
            layer.simulator.set_shape(density, noise_scale);
        }
    }

    /// Take counts, shapes and footprint from a reloaded scene. Buffers are
    /// kept when the counts are unchanged.
    pub fn apply_scene(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &SceneConfig) {
        for config in [&scene.grass, &scene.flower] {
            self.set_shape(config.class, config.density, config.noise_scale);
            self.set_instance_count(device, queue, config.class, config.instance_count);
        }
        self.set_footprint(scene.terrain.footprint);
    }

    pub fn simulator(&self, class: VegetationClass) -> Option<&VegetationFieldSimulator> {
        self.layers.iter().map(|l| &l.simulator).find(|s| s.class() == class)
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = create_depth(device, width, height);
    }

    /// Simulate and draw one frame into `target`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        camera: &Camera,
        inputs: &TickInputs,
    ) {
        self.camera.update(queue, camera);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        for layer in &mut self.layers {
            layer.simulator.tick(queue, &mut encoder, &self.compute, &mut self.material, inputs);
        }

        let ground_params = DrawParams::new(&self.footprint, Vec3::ZERO, [0.2, 0.3, 0.12, 1.0], [0.45, 0.42, 0.3, 1.0]);
        self.ground.prepare(device, queue, &self.material, &ground_params);

        let mut ready = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let params = DrawParams::new(
                &self.footprint,
                layer.grid_origin(&self.footprint),
                layer.base_color,
                layer.tip_color,
            );
            let class = layer.simulator.class();
            ready.push(self.draw.prepare(device, queue, &self.material, class, &params));
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vegetation_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SKY),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            self.ground.draw(&mut pass, self.camera.bind_group(), &self.ground_mesh);

            for (layer, ready) in self.layers.iter().zip(ready) {
                if ready && self.draw.bind(&mut pass, self.camera.bind_group(), layer.simulator.class()) {
                    layer.simulator.draw(&mut pass, layer.mesh.as_ref());
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::WindState;
    use crate::terrain::{HeightResolution, TerrainHeightGenerator};

    #[test]
    fn test_render_offscreen() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let scene = SceneConfig::default();
        let format = wgpu::TextureFormat::Rgba8Unorm;
        let mut frame = FramePipeline::new(&device, &queue, format, (64, 64), &scene);

        let mut generator = TerrainHeightGenerator::new(&device, &scene.terrain.params());
        let field = generator.generate(&device, &queue, HeightResolution::R32);
        frame.set_height_field(Some(field));

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen"),
            size: wgpu::Extent3d { width: 64, height: 64, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let camera = Camera::new(Vec3::new(500.0, 60.0, 520.0), 70.0, 1.0);
        let inputs = TickInputs { time: 0.5, wind: WindState::default() };

        frame.render(&device, &queue, &view, &camera, &inputs);
        frame.render(&device, &queue, &view, &camera, &inputs);

        assert!(frame.material().buffer(VegetationClass::Grass.buffer_name()).is_some());
        assert!(frame.material().buffer(VegetationClass::Flower.buffer_name()).is_some());
        assert!(frame.material().texture(HEIGHT_FIELD_SLOT).is_some());
        let grass = frame.simulator(VegetationClass::Grass).unwrap();
        assert_eq!(grass.allocations(), 1);
        assert_eq!(grass.indirect_args().instance_count, 900);
    }

    #[test]
    fn test_apply_scene_retunes_layers() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let mut scene = SceneConfig::default();
        let mut frame = FramePipeline::new(&device, &queue, wgpu::TextureFormat::Rgba8Unorm, (16, 16), &scene);

        scene.grass.density = 3.0;
        scene.grass.noise_scale = 0.4;
        scene.flower.instance_count = 400;
        frame.apply_scene(&device, &queue, &scene);

        let grass = frame.simulator(VegetationClass::Grass).unwrap();
        assert_eq!(grass.config().density, 3.0);
        assert_eq!(grass.config().noise_scale, 0.4);
        // Same count, storage kept
        assert_eq!(grass.allocations(), 1);

        let flower = frame.simulator(VegetationClass::Flower).unwrap();
        assert_eq!(flower.instance_count(), 400);
        assert_eq!(flower.allocations(), 2);
        assert_eq!(flower.config().density, scene.flower.density);
    }
}

//! Per-class owner of the instance buffer, its kernel dispatch and its
//! indirect draw.

use crate::render::material::Material;
use crate::render::pipeline::vegetation::VegetationComputePipeline;

use super::config::{VegetationClass, VegetationConfig};
use super::indirect::{DrawIndexedIndirectArgs, IndirectArgsBuffer};
use super::layout::{clamp_instance_count, GridLayout};
use super::mesh::{GpuMesh, MeshMetadata};
use super::params::{TickInputs, VegetationParams};
use super::record::{instance_buffer_size, VegetationInstance};

/// What `configure` does with the instance buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationPlan {
    /// Count unchanged, reuse the storage
    Keep,
    /// Allocate storage for this many records, dropping any old buffer
    Allocate(u32),
    /// Count dropped to zero, hold no storage
    Release,
}

/// Storage is only reallocated when the instance count changes.
pub fn plan_allocation(current: Option<u32>, requested: u32) -> AllocationPlan {
    match (current, requested) {
        (Some(n), r) if n == r => AllocationPlan::Keep,
        (None, 0) => AllocationPlan::Keep,
        (_, 0) => AllocationPlan::Release,
        (_, r) => AllocationPlan::Allocate(r),
    }
}

struct InstanceStorage {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    count: u32,
}

/// Simulates one vegetation class.
///
/// Owns its instance buffer exclusively. Grass and flowers each get their own
/// simulator, kernel entry point and material slot, so their buffers never
/// alias.
pub struct VegetationFieldSimulator {
    config: VegetationConfig,
    layout: GridLayout,
    /// Host mirror, zeroed; the kernel overwrites every record
    instances: Vec<VegetationInstance>,
    params_buffer: wgpu::Buffer,
    storage: Option<InstanceStorage>,
    indirect: IndirectArgsBuffer,
    allocations: u32,
    generation: u64,
    bound_generation: Option<u64>,
}

impl VegetationFieldSimulator {
    pub fn new(device: &wgpu::Device, config: VegetationConfig) -> Self {
        let class = config.class;
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{}_params", class.label())),
            size: std::mem::size_of::<VegetationParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indirect = IndirectArgsBuffer::new(device, &format!("{}_indirect_args", class.label()));

        Self {
            config,
            layout: GridLayout::new(0),
            instances: Vec::new(),
            params_buffer,
            storage: None,
            indirect,
            allocations: 0,
            generation: 0,
            bound_generation: None,
        }
    }

    pub fn class(&self) -> VegetationClass {
        self.config.class
    }

    pub fn config(&self) -> &VegetationConfig {
        &self.config
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn instance_count(&self) -> u32 {
        self.layout.amount
    }

    /// Number of instance buffers allocated over the simulator's life.
    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    pub fn indirect_args(&self) -> DrawIndexedIndirectArgs {
        self.indirect.args()
    }

    pub fn instance_buffer(&self) -> Option<&wgpu::Buffer> {
        self.storage.as_ref().map(|s| &s.buffer)
    }

    /// Retune density and noise. Takes effect on the next tick.
    pub fn set_shape(&mut self, density: f32, noise_scale: f32) {
        self.config.density = density;
        self.config.noise_scale = noise_scale;
    }

    /// Kernel uniform for one tick: the current layout and shape plus the
    /// frame's time and wind.
    pub fn params(&self, inputs: &TickInputs) -> VegetationParams {
        VegetationParams::new(
            self.layout,
            self.config.density,
            self.config.noise_scale,
            inputs,
        )
    }

    /// Size the instance buffer for `instance_count` records and refresh the
    /// indirect args from `mesh`. Counts past what one dispatch and one
    /// storage binding can cover on `device` are clamped.
    ///
    /// A missing mesh is not an error: the args are zeroed and nothing draws.
    pub fn configure(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        compute: &VegetationComputePipeline,
        instance_count: u32,
        mesh: Option<&MeshMetadata>,
    ) {
        let class = self.config.class;
        let (instance_count, clamped) = clamp_instance_count(instance_count, &device.limits());
        if clamped {
            log::warn!(
                "{}: instance count exceeds device limits, clamped to {}",
                class.label(),
                instance_count
            );
        }
        let current = self.storage.as_ref().map(|s| s.count);

        match plan_allocation(current, instance_count) {
            AllocationPlan::Keep => {}
            AllocationPlan::Release => {
                log::debug!("{}: instance count 0, releasing instance buffer", class.label());
                self.storage = None;
                self.instances.clear();
                self.generation += 1;
            }
            AllocationPlan::Allocate(count) => {
                // Dropping frees the old buffer once in-flight work retires
                self.storage = None;
                self.instances = vec![VegetationInstance::default(); count as usize];

                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(class.buffer_name()),
                    size: instance_buffer_size(count),
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                queue.write_buffer(&buffer, 0, bytemuck::cast_slice(&self.instances));
                let bind_group = compute.create_bind_group(device, class, &self.params_buffer, &buffer);

                self.storage = Some(InstanceStorage { buffer, bind_group, count });
                self.allocations += 1;
                self.generation += 1;
                log::info!(
                    "{}: allocated {} instances ({} bytes)",
                    class.label(),
                    count,
                    instance_buffer_size(count)
                );
            }
        }

        self.config.instance_count = instance_count;
        self.layout = GridLayout::new(instance_count);
        self.indirect.update(queue, mesh, instance_count, self.config.submesh_index);
    }

    /// Recompute every instance for this tick.
    ///
    /// Writes the uniforms, records the dispatch into `encoder`, and publishes
    /// the instance buffer under the class's slot in `material` whenever the
    /// storage has changed since the last publish.
    pub fn tick(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        compute: &VegetationComputePipeline,
        material: &mut Material,
        inputs: &TickInputs,
    ) {
        let params = self.params(inputs);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let class = self.config.class;
        if let Some(storage) = &self.storage {
            compute.dispatch(encoder, class, &storage.bind_group, self.layout.workgroups());
        }

        if self.bound_generation != Some(self.generation) {
            match &self.storage {
                Some(storage) => material.set_buffer(class.buffer_name(), &storage.buffer),
                None => material.clear_buffer(class.buffer_name()),
            }
            self.bound_generation = Some(self.generation);
        }
    }

    /// Issue the indirect instanced draw. The caller has already set the
    /// pipeline and bind groups on `pass`.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, mesh: Option<&GpuMesh>) {
        let Some(mesh) = mesh else {
            return;
        };
        if self.storage.is_none() {
            return;
        }

        pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
        pass.set_index_buffer(mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed_indirect(self.indirect.buffer(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::WindState;
    use crate::vegetation::mesh::MeshData;

    #[test]
    fn test_plan_allocation() {
        assert_eq!(plan_allocation(None, 900), AllocationPlan::Allocate(900));
        assert_eq!(plan_allocation(Some(900), 900), AllocationPlan::Keep);
        assert_eq!(plan_allocation(Some(900), 100), AllocationPlan::Allocate(100));
        assert_eq!(plan_allocation(Some(900), 0), AllocationPlan::Release);
        assert_eq!(plan_allocation(None, 0), AllocationPlan::Keep);
    }

    #[test]
    fn test_configure_and_tick_headless() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let compute = VegetationComputePipeline::new(&device);
        let mesh = MeshData::grass_blade(4, 0.1, 1.0);
        let mut sim = VegetationFieldSimulator::new(&device, VegetationConfig::grass());
        let mut material = Material::new();

        sim.configure(&device, &queue, &compute, 900, Some(&mesh.metadata));
        sim.configure(&device, &queue, &compute, 900, Some(&mesh.metadata));
        assert_eq!(sim.allocations(), 1);
        assert_eq!(sim.layout().amount_per_row, 30);
        assert_eq!(sim.indirect_args().instance_count, 900);
        assert_eq!(sim.indirect_args().index_count_per_instance, mesh.metadata.index_count(0).unwrap());

        let inputs = TickInputs { time: 1.0, wind: WindState::default() };
        for _ in 0..3 {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("test_encoder"),
            });
            sim.tick(&queue, &mut encoder, &compute, &mut material, &inputs);
            queue.submit(std::iter::once(encoder.finish()));
        }
        assert_eq!(sim.allocations(), 1);
        assert!(material.buffer("GrassBuffer").is_some());
        assert!(material.buffer("FlowerBuffer").is_none());
        assert_eq!(material.revision(), 1);
    }

    #[test]
    fn test_missing_mesh_draws_nothing() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let compute = VegetationComputePipeline::new(&device);
        let mut sim = VegetationFieldSimulator::new(&device, VegetationConfig::flower());
        sim.configure(&device, &queue, &compute, 100, None);
        assert_eq!(sim.indirect_args(), DrawIndexedIndirectArgs::EMPTY);
    }

    #[test]
    fn test_zero_count_releases_and_unpublishes() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let compute = VegetationComputePipeline::new(&device);
        let mesh = MeshData::grass_blade(2, 0.1, 1.0);
        let mut sim = VegetationFieldSimulator::new(&device, VegetationConfig::grass());
        let mut material = Material::new();
        let inputs = TickInputs { time: 0.0, wind: WindState::default() };

        sim.configure(&device, &queue, &compute, 16, Some(&mesh.metadata));
        let mut encoder = device.create_command_encoder(&Default::default());
        sim.tick(&queue, &mut encoder, &compute, &mut material, &inputs);
        queue.submit(std::iter::once(encoder.finish()));
        assert!(material.buffer("GrassBuffer").is_some());

        sim.configure(&device, &queue, &compute, 0, Some(&mesh.metadata));
        let mut encoder = device.create_command_encoder(&Default::default());
        sim.tick(&queue, &mut encoder, &compute, &mut material, &inputs);
        queue.submit(std::iter::once(encoder.finish()));
        assert!(sim.instance_buffer().is_none());
        assert!(material.buffer("GrassBuffer").is_none());
        assert_eq!(sim.indirect_args().instance_count, 0);
    }

    #[test]
    fn test_set_shape_reaches_next_tick() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let compute = VegetationComputePipeline::new(&device);
        let mut sim = VegetationFieldSimulator::new(&device, VegetationConfig::grass());
        sim.configure(&device, &queue, &compute, 900, None);
        let inputs = TickInputs { time: 3.0, wind: WindState::default() };

        sim.set_shape(2.5, 0.3);
        let params = sim.params(&inputs);
        assert_eq!(params.density, 2.5);
        assert_eq!(params.noise_scale, 0.3);
        assert_eq!(params.amount, 900);
        assert_eq!(params.time, 3.0);
        // Shape changes never touch storage
        assert_eq!(sim.allocations(), 1);
    }

    #[test]
    fn test_configure_clamps_to_device_limits() {
        let Some((device, queue)) = crate::render::context::headless_device() else {
            return;
        };
        let compute = VegetationComputePipeline::new(&device);
        let mesh = MeshData::grass_blade(2, 0.1, 1.0);
        let mut sim = VegetationFieldSimulator::new(&device, VegetationConfig::grass());
        let max = crate::vegetation::max_instances(&device.limits());

        sim.configure(&device, &queue, &compute, max.saturating_add(1000), Some(&mesh.metadata));
        assert_eq!(sim.instance_count(), max);
        assert_eq!(sim.config().instance_count, max);
        assert_eq!(sim.indirect_args().instance_count, max);
        assert!(sim.layout().workgroups() <= device.limits().max_compute_workgroups_per_dimension);
    }
}

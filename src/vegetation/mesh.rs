//! Mesh metadata and the small procedural meshes instanced over a field.
//!
//! Loading meshes from assets is someone else's job. The pipeline only needs
//! the submesh table ([`MeshMetadata`]) to derive indirect draw arguments and
//! a vertex/index buffer pair ([`GpuMesh`]) to bind when drawing.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Index range of one submesh inside a shared index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    /// First index in the index buffer
    pub index_start: u32,
    /// Number of indices
    pub index_count: u32,
    /// Value added to every index before fetching a vertex
    pub base_vertex: u32,
}

/// Read-only submesh table of a mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshMetadata {
    submeshes: Vec<SubMesh>,
}

impl MeshMetadata {
    pub fn new(submeshes: Vec<SubMesh>) -> Self {
        Self { submeshes }
    }

    /// Metadata for a mesh made of a single submesh covering `index_count` indices.
    pub fn single(index_count: u32) -> Self {
        Self::new(vec![SubMesh {
            index_start: 0,
            index_count,
            base_vertex: 0,
        }])
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    pub fn submesh(&self, index: usize) -> Option<&SubMesh> {
        self.submeshes.get(index)
    }

    pub fn index_count(&self, index: usize) -> Option<u32> {
        self.submesh(index).map(|s| s.index_count)
    }

    pub fn index_start(&self, index: usize) -> Option<u32> {
        self.submesh(index).map(|s| s.index_start)
    }

    pub fn base_vertex(&self, index: usize) -> Option<u32> {
        self.submesh(index).map(|s| s.base_vertex)
    }
}

/// Vertex of a vegetation mesh (32 bytes).
/// Must match `VertexInput` in vegetation_draw.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// `uv.y` runs 0 at the root to 1 at the tip; the draw shader bends by it.
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side mesh.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub metadata: MeshMetadata,
}

impl MeshData {
    /// Tapered grass blade: `segments` quads stacked up to a single tip vertex.
    pub fn grass_blade(segments: u32, width: f32, height: f32) -> Self {
        let segments = segments.max(1);
        let mut vertices = Vec::with_capacity(segments as usize * 2 + 1);
        let mut indices = Vec::with_capacity(segments as usize * 6);
        let normal = [0.0, 0.0, 1.0];

        for i in 0..segments {
            let t = i as f32 / segments as f32;
            let half = width * 0.5 * (1.0 - t);
            let y = height * t;
            vertices.push(MeshVertex { position: [-half, y, 0.0], normal, uv: [0.0, t] });
            vertices.push(MeshVertex { position: [half, y, 0.0], normal, uv: [1.0, t] });
        }
        vertices.push(MeshVertex { position: [0.0, height, 0.0], normal, uv: [0.5, 1.0] });

        for i in 0..segments - 1 {
            let b = i * 2;
            indices.extend_from_slice(&[b, b + 1, b + 3, b, b + 3, b + 2]);
        }
        let b = (segments - 1) * 2;
        indices.extend_from_slice(&[b, b + 1, b + 2]);

        let metadata = MeshMetadata::single(indices.len() as u32);
        Self { vertices, indices, metadata }
    }

    /// Stem plus a flat `petals`-gon head. Submesh 0 is the whole flower,
    /// 1 the stem and 2 the head.
    pub fn flower(petals: u32, stem_height: f32, head_radius: f32) -> Self {
        let petals = petals.max(3);
        let stem = Self::grass_blade(1, head_radius * 0.3, stem_height);
        let mut vertices = stem.vertices;
        let mut indices = stem.indices;
        let stem_indices = indices.len() as u32;

        let center = vertices.len() as u32;
        let up = [0.0, 1.0, 0.0];
        vertices.push(MeshVertex { position: [0.0, stem_height, 0.0], normal: up, uv: [0.5, 1.0] });
        for i in 0..petals {
            let a = i as f32 / petals as f32 * std::f32::consts::TAU;
            vertices.push(MeshVertex {
                position: [a.cos() * head_radius, stem_height, a.sin() * head_radius],
                normal: up,
                uv: [0.5 + a.cos() * 0.5, 1.0],
            });
        }
        for i in 0..petals {
            let next = (i + 1) % petals;
            indices.extend_from_slice(&[center, center + next + 1, center + i + 1]);
        }

        let total = indices.len() as u32;
        let metadata = MeshMetadata::new(vec![
            SubMesh { index_start: 0, index_count: total, base_vertex: 0 },
            SubMesh { index_start: 0, index_count: stem_indices, base_vertex: 0 },
            SubMesh { index_start: stem_indices, index_count: petals * 3, base_vertex: 0 },
        ]);
        Self { vertices, indices, metadata }
    }

    /// `cells x cells` grid over the unit square in XZ, `uv = (x, z)`.
    /// The ground shader stretches it over the terrain footprint.
    pub fn ground_grid(cells: u32) -> Self {
        let cells = cells.max(1);
        let row = cells + 1;
        let mut vertices = Vec::with_capacity((row * row) as usize);
        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);

        for z in 0..row {
            for x in 0..row {
                let u = x as f32 / cells as f32;
                let v = z as f32 / cells as f32;
                vertices.push(MeshVertex { position: [u, 0.0, v], normal: [0.0, 1.0, 0.0], uv: [u, v] });
            }
        }
        for z in 0..cells {
            for x in 0..cells {
                let i = z * row + x;
                indices.extend_from_slice(&[i, i + row, i + 1, i + 1, i + row, i + row + 1]);
            }
        }

        let metadata = MeshMetadata::single(indices.len() as u32);
        Self { vertices, indices, metadata }
    }
}

/// Mesh uploaded to the GPU.
pub struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    metadata: MeshMetadata,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_vertices", label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_indices", label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            metadata: mesh.metadata.clone(),
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    pub fn metadata(&self) -> &MeshMetadata {
        &self.metadata
    }
}

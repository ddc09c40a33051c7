//! Indirect draw arguments derived from mesh metadata.
//!
//! The argument record is 5 x u32 in the order consumed by
//! `draw_indexed_indirect`: index count, instance count, first index,
//! base vertex, first instance.

use bytemuck::{Pod, Zeroable};

use super::mesh::MeshMetadata;

/// Arguments for an indexed indirect draw (20 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    pub index_count_per_instance: u32,
    pub instance_count: u32,
    pub start_index_location: u32,
    pub base_vertex_location: u32,
    pub start_instance_location: u32,
}

// Compile-time layout validation.
const _: [(); 20] = [(); std::mem::size_of::<DrawIndexedIndirectArgs>()];

impl DrawIndexedIndirectArgs {
    /// Draws nothing. Used whenever the mesh is absent.
    pub const EMPTY: Self = Self {
        index_count_per_instance: 0,
        instance_count: 0,
        start_index_location: 0,
        base_vertex_location: 0,
        start_instance_location: 0,
    };

    pub fn as_array(&self) -> [u32; 5] {
        [
            self.index_count_per_instance,
            self.instance_count,
            self.start_index_location,
            self.base_vertex_location,
            self.start_instance_location,
        ]
    }
}

/// Build arguments for `instance_count` copies of one submesh.
///
/// `submesh_index` is clamped into the mesh's submesh range. A missing mesh,
/// or one without submeshes, yields [`DrawIndexedIndirectArgs::EMPTY`].
pub fn build_indirect_args(
    mesh: Option<&MeshMetadata>,
    instance_count: u32,
    submesh_index: usize,
) -> DrawIndexedIndirectArgs {
    let Some(mesh) = mesh else {
        return DrawIndexedIndirectArgs::EMPTY;
    };
    if mesh.submesh_count() == 0 {
        return DrawIndexedIndirectArgs::EMPTY;
    }

    let index = clamp_submesh_index(mesh, submesh_index);
    let Some(sub) = mesh.submesh(index) else {
        return DrawIndexedIndirectArgs::EMPTY;
    };

    DrawIndexedIndirectArgs {
        index_count_per_instance: sub.index_count,
        instance_count,
        start_index_location: sub.index_start,
        base_vertex_location: sub.base_vertex,
        start_instance_location: 0,
    }
}

/// Clamp a submesh index into `[0, submesh_count - 1]`.
pub fn clamp_submesh_index(mesh: &MeshMetadata, submesh_index: usize) -> usize {
    submesh_index.min(mesh.submesh_count().saturating_sub(1))
}

/// Tracks which arguments were last written so the GPU buffer is only
/// rewritten when the instance count or the mesh changes.
#[derive(Debug, Default)]
pub struct IndirectArgsCache {
    key: Option<(u32, usize, Option<MeshMetadata>)>,
    args: DrawIndexedIndirectArgs,
}

impl IndirectArgsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new arguments if anything they derive from changed since
    /// the previous call, `None` otherwise.
    pub fn refresh(
        &mut self,
        mesh: Option<&MeshMetadata>,
        instance_count: u32,
        submesh_index: usize,
    ) -> Option<DrawIndexedIndirectArgs> {
        let key = (instance_count, submesh_index, mesh.cloned());
        if self.key.as_ref() == Some(&key) {
            return None;
        }

        if mesh.is_none() {
            log::warn!("Vegetation mesh absent: indirect args zeroed, nothing will draw");
        }
        self.args = build_indirect_args(mesh, instance_count, submesh_index);
        self.key = Some(key);
        Some(self.args)
    }

    pub fn args(&self) -> DrawIndexedIndirectArgs {
        self.args
    }
}

/// GPU-resident argument buffer consumed by `draw_indexed_indirect`.
pub struct IndirectArgsBuffer {
    buffer: wgpu::Buffer,
    cache: IndirectArgsCache,
}

impl IndirectArgsBuffer {
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<DrawIndexedIndirectArgs>() as u64,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            cache: IndirectArgsCache::new(),
        }
    }

    /// Rewrite the buffer if the derived arguments are stale.
    ///
    /// The write is queued before any draw recorded afterwards is submitted,
    /// so draws in the same or later submissions observe it.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        mesh: Option<&MeshMetadata>,
        instance_count: u32,
        submesh_index: usize,
    ) -> bool {
        match self.cache.refresh(mesh, instance_count, submesh_index) {
            Some(args) => {
                queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&args));
                log::debug!("Indirect args updated: {:?}", args.as_array());
                true
            }
            None => false,
        }
    }

    pub fn args(&self) -> DrawIndexedIndirectArgs {
        self.cache.args()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vegetation::mesh::SubMesh;

    #[test]
    fn test_layout_matches_webgpu() {
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
        assert_eq!(std::mem::offset_of!(DrawIndexedIndirectArgs, instance_count), 4);
        assert_eq!(std::mem::offset_of!(DrawIndexedIndirectArgs, base_vertex_location), 12);
        assert_eq!(std::mem::offset_of!(DrawIndexedIndirectArgs, start_instance_location), 16);
    }

    #[test]
    fn test_null_mesh_is_all_zero() {
        for count in [0, 1, 50, 900, u32::MAX] {
            let args = build_indirect_args(None, count, 0);
            assert_eq!(args.as_array(), [0, 0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_single_submesh() {
        let mesh = MeshMetadata::single(300);
        let args = build_indirect_args(Some(&mesh), 50, 0);
        assert_eq!(args.as_array(), [300, 50, 0, 0, 0]);
    }

    #[test]
    fn test_bytes_are_in_draw_order() {
        let mesh = MeshMetadata::single(300);
        let args = build_indirect_args(Some(&mesh), 50, 0);
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&args));
        assert_eq!(words, &[300, 50, 0, 0, 0]);
    }

    #[test]
    fn test_submesh_index_clamped() {
        let mesh = MeshMetadata::new(vec![
            SubMesh { index_start: 0, index_count: 6, base_vertex: 0 },
            SubMesh { index_start: 6, index_count: 9, base_vertex: 4 },
        ]);
        let args = build_indirect_args(Some(&mesh), 10, 7);
        assert_eq!(args.as_array(), [9, 10, 6, 4, 0]);
        assert_eq!(clamp_submesh_index(&mesh, 0), 0);
    }

    #[test]
    fn test_mesh_without_submeshes_draws_nothing() {
        let mesh = MeshMetadata::default();
        assert_eq!(build_indirect_args(Some(&mesh), 10, 0), DrawIndexedIndirectArgs::EMPTY);
    }

    #[test]
    fn test_cache_only_rebuilds_on_change() {
        let mesh = MeshMetadata::single(300);
        let mut cache = IndirectArgsCache::new();

        assert!(cache.refresh(Some(&mesh), 50, 0).is_some());
        assert!(cache.refresh(Some(&mesh), 50, 0).is_none());
        assert!(cache.refresh(Some(&mesh), 60, 0).is_some());
        assert_eq!(cache.args().instance_count, 60);

        let other = MeshMetadata::single(120);
        assert_eq!(cache.refresh(Some(&other), 60, 0).map(|a| a.index_count_per_instance), Some(120));
        assert_eq!(cache.refresh(None, 60, 0), Some(DrawIndexedIndirectArgs::EMPTY));
        assert!(cache.refresh(None, 60, 0).is_none());
    }
}

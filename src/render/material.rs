//! Named resource slots shared between compute producers and the draw stage.
//!
//! Producers publish GPU resources under agreed names (`"GrassBuffer"`,
//! `"FlowerBuffer"`, `"HeightField"`); the draw pipeline looks them up when
//! it rebuilds its bind groups. `revision` bumps on every change so
//! consumers can cache bind groups until something is rebound.

use std::collections::HashMap;

/// Slot under which the terrain height texture is published.
pub const HEIGHT_FIELD_SLOT: &str = "HeightField";

#[derive(Default)]
pub struct Material {
    buffers: HashMap<&'static str, wgpu::Buffer>,
    textures: HashMap<&'static str, wgpu::TextureView>,
    revision: u64,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buffer(&mut self, name: &'static str, buffer: &wgpu::Buffer) {
        self.buffers.insert(name, buffer.clone());
        self.revision += 1;
    }

    pub fn clear_buffer(&mut self, name: &'static str) {
        if self.buffers.remove(name).is_some() {
            self.revision += 1;
        }
    }

    pub fn buffer(&self, name: &str) -> Option<&wgpu::Buffer> {
        self.buffers.get(name)
    }

    pub fn set_texture(&mut self, name: &'static str, view: &wgpu::TextureView) {
        self.textures.insert(name, view.clone());
        self.revision += 1;
    }

    pub fn clear_texture(&mut self, name: &'static str) {
        if self.textures.remove(name).is_some() {
            self.revision += 1;
        }
    }

    pub fn texture(&self, name: &str) -> Option<&wgpu::TextureView> {
        self.textures.get(name)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

//! GPU-resident height field texture and its synchronous texel readback.

use crate::core::error::Error;
use crate::core::types::Result;

use super::height_field::{HeightFieldSource, HeightFormat};

/// Format the terrain kernel writes. Storage-writable and readable back.
pub const HEIGHT_FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Height field texture written by the terrain kernel and read by the
/// vegetation material and the sampler.
pub struct HeightFieldTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl HeightFieldTexture {
    /// Allocate backing storage, writable by compute kernels.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("height_field"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HEIGHT_FIELD_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self { texture, view, width, height }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Borrow as a [`HeightFieldSource`] that reads through `device`/`queue`.
    pub fn source<'a>(&'a self, device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> GpuHeightSource<'a> {
        GpuHeightSource {
            texture: self,
            device,
            queue,
        }
    }
}

/// A height field texture paired with the device and queue to read it.
pub struct GpuHeightSource<'a> {
    texture: &'a HeightFieldTexture,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl HeightFieldSource for GpuHeightSource<'_> {
    type Staging = wgpu::Buffer;

    fn extent(&self) -> (u32, u32) {
        (self.texture.width, self.texture.height)
    }

    fn texture_format(&self) -> wgpu::TextureFormat {
        self.texture.texture.format()
    }

    fn create_staging(&self, format: HeightFormat) -> wgpu::Buffer {
        // One row of one texel; copies require the row pitch alignment
        let size = (format.bytes_per_texel() as u64).max(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64);
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("height_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn read_red(&self, staging: &mut wgpu::Buffer, format: HeightFormat, x: u32, y: u32) -> Result<f32> {
        if x >= self.texture.width || y >= self.texture.height {
            return Err(Error::Readback(format!(
                "texel ({}, {}) outside {}x{} height field",
                x, y, self.texture.width, self.texture.height
            )));
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("height_readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let mapped = self
            .device
            .poll(wgpu::PollType::Wait { submission_index: None, timeout: None })
            .map_err(|e| Error::Readback(e.to_string()))
            .and_then(|_| match rx.recv() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(Error::Readback(e.to_string())),
                Err(e) => Err(Error::Readback(e.to_string())),
            });

        let value = mapped.and_then(|()| {
            let data = slice.get_mapped_range();
            format.decode_red(&data[..format.bytes_per_texel()])
        });
        // Unmap on every path, failed or not, so the next read can map again
        staging.unmap();
        value
    }
}

//! Height field storage, texel formats, and the readback seam.
//!
//! A height field is a `width x height` grid of normalized samples in
//! `[0, 1]` (height divided by the terrain's max height), stored in the red
//! channel of a texture. [`HeightFieldSource`] is what the sampler reads
//! through: the GPU texture in the running application, a CPU grid in tests
//! and headless tools.

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Square height field resolutions the generator accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeightResolution {
    R8,
    R16,
    R32,
    R64,
    R128,
    #[default]
    R256,
    R512,
}

impl HeightResolution {
    pub const ALL: [Self; 7] = [
        Self::R8, Self::R16, Self::R32, Self::R64, Self::R128, Self::R256, Self::R512,
    ];

    /// Texels per side.
    pub fn texels(self) -> u32 {
        match self {
            Self::R8 => 8,
            Self::R16 => 16,
            Self::R32 => 32,
            Self::R64 => 64,
            Self::R128 => 128,
            Self::R256 => 256,
            Self::R512 => 512,
        }
    }

    pub fn from_texels(texels: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.texels() == texels)
    }
}

/// Texel formats the sampler knows how to pull a red channel out of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeightFormat {
    R32Float,
    Rg32Float,
    Rgba32Float,
    R16Float,
    Rgba16Float,
    R8Unorm,
    Rgba8Unorm,
}

impl HeightFormat {
    /// Reconcile a texture format with one the readback can decode.
    /// `None` means the format cannot be read back as a height.
    pub fn from_texture_format(format: wgpu::TextureFormat) -> Option<Self> {
        use wgpu::TextureFormat as F;
        match format {
            F::R32Float => Some(Self::R32Float),
            F::Rg32Float => Some(Self::Rg32Float),
            F::Rgba32Float => Some(Self::Rgba32Float),
            F::R16Float => Some(Self::R16Float),
            F::Rgba16Float => Some(Self::Rgba16Float),
            F::R8Unorm => Some(Self::R8Unorm),
            F::Rgba8Unorm => Some(Self::Rgba8Unorm),
            _ => None,
        }
    }

    /// Like [`HeightFormat::from_texture_format`], failing with
    /// [`Error::UnsupportedFormat`].
    pub fn require(format: wgpu::TextureFormat) -> Result<Self> {
        Self::from_texture_format(format).ok_or(Error::UnsupportedFormat(format))
    }

    pub fn texture_format(self) -> wgpu::TextureFormat {
        use wgpu::TextureFormat as F;
        match self {
            Self::R32Float => F::R32Float,
            Self::Rg32Float => F::Rg32Float,
            Self::Rgba32Float => F::Rgba32Float,
            Self::R16Float => F::R16Float,
            Self::Rgba16Float => F::Rgba16Float,
            Self::R8Unorm => F::R8Unorm,
            Self::Rgba8Unorm => F::Rgba8Unorm,
        }
    }

    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::R8Unorm => 1,
            Self::R16Float => 2,
            Self::R32Float | Self::Rgba8Unorm => 4,
            Self::Rg32Float | Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }

    /// Decode the red channel of one texel. Red is always the first component.
    pub fn decode_red(self, texel: &[u8]) -> Result<f32> {
        if texel.len() < self.bytes_per_texel() {
            return Err(Error::Readback(format!(
                "{:?} texel needs {} bytes, got {}",
                self,
                self.bytes_per_texel(),
                texel.len()
            )));
        }

        let value = match self {
            Self::R32Float | Self::Rg32Float | Self::Rgba32Float => {
                f32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]])
            }
            Self::R16Float | Self::Rgba16Float => {
                half::f16::from_le_bytes([texel[0], texel[1]]).to_f32()
            }
            Self::R8Unorm | Self::Rgba8Unorm => texel[0] as f32 / 255.0,
        };
        Ok(value)
    }
}

/// Anything a single height texel can be read back from.
///
/// `Staging` is the one-texel readback target the sampler owns and recreates
/// when the source's format changes.
pub trait HeightFieldSource {
    type Staging;

    /// `(width, height)` in texels
    fn extent(&self) -> (u32, u32);

    /// Format of the backing texture, before reconciliation
    fn texture_format(&self) -> wgpu::TextureFormat;

    /// Allocate a readback target for texels of `format`.
    fn create_staging(&self, format: HeightFormat) -> Self::Staging;

    /// Read the red channel of texel `(x, y)` through `staging`. Blocks until
    /// the value is on the CPU.
    fn read_red(&self, staging: &mut Self::Staging, format: HeightFormat, x: u32, y: u32) -> Result<f32>;
}

/// CPU-resident height field, row-major with `y` selecting the row.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: u32,
    height: u32,
    data: Vec<f32>,
    format: wgpu::TextureFormat,
}

impl HeightField {
    /// Flat field at `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value.clamp(0.0, 1.0); width as usize * height as usize],
            format: wgpu::TextureFormat::R32Float,
        }
    }

    /// Field from row-major samples. Samples are clamped into `[0, 1]`.
    pub fn from_samples(width: u32, height: u32, mut data: Vec<f32>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::Readback(format!(
                "{}x{} height field needs {} samples, got {}",
                width,
                height,
                width as usize * height as usize,
                data.len()
            )));
        }
        for v in &mut data {
            *v = v.clamp(0.0, 1.0);
        }
        Ok(Self {
            width,
            height,
            data,
            format: wgpu::TextureFormat::R32Float,
        })
    }

    /// Field whose texel `(x, y)` is `f(x, y)`, clamped into `[0, 1]`.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y).clamp(0.0, 1.0));
            }
        }
        Self {
            width,
            height,
            data,
            format: wgpu::TextureFormat::R32Float,
        }
    }

    /// Declare a different backing texture format (what a GPU texture
    /// mirroring this field would use).
    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Normalized sample at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }
}

impl HeightFieldSource for HeightField {
    type Staging = ();

    fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn texture_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn create_staging(&self, _format: HeightFormat) -> Self::Staging {}

    fn read_red(&self, _staging: &mut (), _format: HeightFormat, x: u32, y: u32) -> Result<f32> {
        self.get(x, y).ok_or_else(|| {
            Error::Readback(format!(
                "texel ({}, {}) outside {}x{} height field",
                x, y, self.width, self.height
            ))
        })
    }
}

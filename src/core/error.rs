//! Error types for the meadow crate

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Readback error: {0}")]
    Readback(String),

    #[error("Unsupported height field format: {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),
}

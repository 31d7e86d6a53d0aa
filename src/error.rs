// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Error type shared by every pipeline component.
//!
//! Failures are contained at the preset boundary: setup errors disable one
//! preset, allocation errors drop one frame. Nothing here aborts the host.

use crate::render::image::ImageId;

/// Pipeline result type
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline error types
#[derive(Debug)]
pub enum PipelineError {
    /// A kernel failed to compile or bind while activating a preset
    Setup(String),
    /// The device could not allocate an image buffer
    Allocation {
        label: &'static str,
        width: u32,
        height: u32,
    },
    /// A command referenced an image the device does not know about
    UnknownImage(ImageId),
    /// The request is valid but not supported by this device or format
    Unsupported(String),
    /// Backend failure outside of setup (adapter request, readback...)
    Device(String),
    /// Unknown parameter name or storage key
    UnknownParam(String),
    /// Malformed configuration
    Config(String),
    Io(std::io::Error),
}

impl PipelineError {
    /// Errors that only cost the current frame; the next frame retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, PipelineError::Allocation { .. })
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Setup(msg) => write!(f, "Setup failed: {}", msg),
            PipelineError::Allocation {
                label,
                width,
                height,
            } => write!(
                f,
                "Allocation failed: {} ({}x{})",
                label, width, height
            ),
            PipelineError::UnknownImage(id) => write!(f, "Unknown image: {:?}", id),
            PipelineError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            PipelineError::Device(msg) => write!(f, "Device error: {}", msg),
            PipelineError::UnknownParam(name) => write!(f, "Unknown parameter: {}", name),
            PipelineError::Config(msg) => write!(f, "Config error: {}", msg),
            PipelineError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> PipelineError {
        PipelineError::Io(err)
    }
}

// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! crt_pixel re-renders captured screen frames through a chain of GPU
//! image-processing stages that emulate a CRT: scanlines, phosphor dot masks,
//! chroma bleed, bloom and gamma curves, in real time while the output window
//! may be resized or dragged.
//!
//! A frame flows through an effect preset's fixed pass graph:
//! the visible part of the capture is cropped into a working buffer, split
//! into YIQ, chroma is smeared, a procedurally synthesized dot mask and a
//! bloom are combined in the CRT composite, and the result is resampled onto
//! the destination. Every pass is encoded into one command list per frame
//! and submitted once to a [`RenderDevice`](render::device::RenderDevice):
//! the headless `CpuDevice` or, with the `wgpu` feature, `WgpuDevice`.
//!
//! Hosts talk to [`Pipeline`](pipeline::Pipeline); capture, windowing and
//! recording stay outside of this crate.

#[macro_use]
mod macros;

/// per-frame linear interpolation of effect intensities
pub mod animated;

/// TOML configuration: log level, initial preset, parameter overrides
pub mod config;

/// error type shared by every component
pub mod error;

/// log
pub mod log;

/// host facade: frame input, rendering, copy-out, interaction
pub mod pipeline;

/// Render module, the effect pipeline itself.
/// image: buffers, slots and scale tiers.
/// pass: kernels, uniform blocks and command lists.
/// device: the device seam and its backends.
/// resample, blur, dotmask: reusable stages.
/// params, effect, presets, registry: parameterized pass graphs.
pub mod render;

pub use error::{PipelineError, Result};
pub use pipeline::{CapturedFrame, FrameOutcome, OutputFrame, Pipeline};

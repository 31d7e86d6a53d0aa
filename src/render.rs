// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Render Module
//!
//! Image buffers, pass encoding and the effect stages built on them.
//!
//! ## Submodules
//! - `image`: buffer descriptors, `ImageSlot`, scale tiers, normalized rects
//! - `pass`: kernel kinds, uniform blocks, `CommandList`
//! - `device`: `RenderDevice` seam, `CpuDevice`, `WgpuDevice`
//! - `color`: HSB and YIQ conversions
//! - `resample`, `blur`, `dotmask`: reusable stages
//! - `params`: parameter schema behind `param_block!`
//! - `effect`, `presets`, `registry`: presets and their selection

pub mod blur;
pub mod color;
pub mod device;
pub mod dotmask;
pub mod effect;
pub mod image;
pub mod params;
pub mod pass;
pub mod presets;
pub mod registry;
pub mod resample;

pub use device::{CpuDevice, RenderDevice};
pub use effect::{EffectPreset, FrameInput};
pub use image::{ImageBuffer, ImageDesc, ImageFormat, ImageSlot, ImageUsage, ImageView, Rect};
pub use pass::{CommandList, PassKind};
pub use registry::{Diagnostic, EffectRegistry};

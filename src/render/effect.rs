// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Effect Presets
//!
//! A preset ("shader") is one parameter table plus one fixed pass graph:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ EffectPreset                                                 │
//! │   params      ParamTable<Block>  ◄── preference panels       │
//! │   transition  AnimatedValue<f32> ◄── window gestures         │
//! │   slots       ImageSlot per intermediate, per scale tier     │
//! │                                                              │
//! │   activate()  compile kernels, start transition at rest      │
//! │   encode()    snapshot params, ensure slots, record passes   │
//! │   retire()    release every slot                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Presets never submit; the pipeline submits the finished list once.

use crate::animated::AnimatedValue;
use crate::error::Result;
use crate::render::device::RenderDevice;
use crate::render::image::{ImageView, Rect};
use crate::render::params::ParamSurface;
use crate::render::pass::CommandList;

/// Per-frame inputs handed to the active preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// Latest captured frame
    pub source: ImageView,
    /// Visible part of `source`, normalized
    pub source_rect: Rect,
    /// Surface or recording target
    pub destination: ImageView,
    /// Transition value after this frame's `advance()`
    pub intensity: f32,
}

pub trait EffectPreset {
    fn name(&self) -> &'static str;

    fn params(&self) -> &dyn ParamSurface;

    fn params_mut(&mut self) -> &mut dyn ParamSurface;

    fn transition(&self) -> &AnimatedValue<f32>;

    fn transition_mut(&mut self) -> &mut AnimatedValue<f32>;

    fn is_active(&self) -> bool;

    /// Compile kernels and do one-time setup. A failure here disables the
    /// preset for the rest of the session.
    fn activate(&mut self, device: &mut dyn RenderDevice) -> Result<()>;

    /// Release transient resources.
    fn retire(&mut self, device: &mut dyn RenderDevice);

    /// The last encoded list never ran. Drop anything cached on the
    /// assumption that it did.
    fn invalidate(&mut self) {}

    /// Record this frame's passes. Buffers are (re)allocated as needed.
    fn encode(
        &mut self,
        device: &mut dyn RenderDevice,
        frame: &FrameInput,
        commands: &mut CommandList,
    ) -> Result<()>;
}

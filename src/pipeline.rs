// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Pipeline
//!
//! Host-facing facade. The capture collaborator pushes frames, the
//! presentation collaborator asks for one rendered frame per display
//! refresh, the recorder copies finished frames out and the window
//! collaborator drives the transition of the active preset:
//!
//! ```text
//! push_frame ──► input slot (BGRA8) ─┐
//!                                    ▼
//! render(dst) ─► advance transition ─► preset.encode ─► submit once
//!                                                          │
//! copy_output(dst) ◄───────────────────────────────────────┘
//! ```

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::render::device::RenderDevice;
use crate::render::effect::FrameInput;
use crate::render::image::{
    ImageBuffer, ImageDesc, ImageFormat, ImageSlot, ImageUsage, ImageView, Rect,
};
use crate::render::params::ParamSurface;
use crate::render::pass::CommandList;
use crate::render::presets::{CompositeCrt, Scanlines};
use crate::render::registry::{Diagnostic, EffectRegistry, FALLBACK_PRESET};
use log::{debug, info, warn};

/// One captured screen frame, BGRA8 premultiplied.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// May include row padding
    pub bytes_per_row: u32,
    pub data: Vec<u8>,
    /// Seconds, host clock
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Commands were submitted to the destination
    Presented,
    /// Nothing captured yet
    Skipped,
    /// A buffer could not be allocated; the next frame retries
    Dropped,
}

/// A finished frame copied out for recording.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFrame {
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
    pub format: ImageFormat,
    pub timestamp: f64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameMeta {
    width: u32,
    height: u32,
    timestamp: f64,
}

pub struct Pipeline<D: RenderDevice = Box<dyn RenderDevice>> {
    device: D,
    registry: EffectRegistry,
    input: ImageSlot,
    latest: Option<FrameMeta>,
    capture_rect: Rect,
    texture_rect: Rect,
    output_format: ImageFormat,
    rendered: u64,
    dropped: u64,
}

impl<D: RenderDevice> Pipeline<D> {
    /// A pipeline with only the passthrough preset.
    pub fn new(device: D) -> Self {
        Self::with_registry(device, EffectRegistry::new())
    }

    pub fn with_registry(device: D, registry: EffectRegistry) -> Self {
        info!(
            "Pipeline: device {:?}, presets {:?}",
            device.name(),
            registry.names()
        );
        Self {
            device,
            registry,
            input: ImageSlot::with_usage("capture", ImageUsage::UPLOAD),
            latest: None,
            capture_rect: Rect::UNIT,
            texture_rect: Rect::UNIT,
            output_format: ImageFormat::Bgra8Unorm,
            rendered: 0,
            dropped: 0,
        }
    }

    /// Passthrough, Composite CRT and Scanlines, in that order.
    pub fn with_default_presets(device: D) -> Self {
        let mut registry = EffectRegistry::new();
        registry.register(Box::new(CompositeCrt::new()));
        registry.register(Box::new(Scanlines::new()));
        Self::with_registry(device, registry)
    }

    /// Default presets with the configured overrides and output format,
    /// the configured initial preset already selected.
    pub fn from_config(device: D, config: &PipelineConfig) -> Result<Self> {
        let mut pipeline = Self::with_default_presets(device);
        pipeline.output_format = config.output_format()?;
        let applied = config.apply_overrides(&mut pipeline.registry);
        debug!("Pipeline: {} parameter overrides applied", applied);
        let index = config.initial_index(&pipeline.registry);
        pipeline.select_preset(index)?;
        Ok(pipeline)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn registry(&self) -> &EffectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EffectRegistry {
        &mut self.registry
    }

    /// Activate a preset; see [`EffectRegistry::select`].
    pub fn select_preset(&mut self, index: usize) -> Result<usize> {
        self.registry.select(&mut self.device, index)
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.registry.take_diagnostics()
    }

    /// Parameters of the active preset.
    pub fn params_mut(&mut self) -> Option<&mut dyn ParamSurface> {
        self.registry.current_mut().map(|p| p.params_mut())
    }

    pub fn revert_defaults(&mut self) {
        if let Some(params) = self.params_mut() {
            params.revert_to_defaults();
        }
    }

    /// A window drag or resize started: ramp the active preset's transition
    /// to `target` over `steps` frames.
    pub fn begin_interaction(&mut self, target: f32, steps: u32) {
        if let Some(preset) = self.registry.current_mut() {
            preset.transition_mut().set_target(target, steps);
        }
    }

    /// The gesture ended: ramp back to rest.
    pub fn end_interaction(&mut self, steps: u32) {
        self.begin_interaction(0.0, steps);
    }

    /// Screen-space part of the display being captured. Stored and reported
    /// back; the capture collaborator acts on it.
    pub fn set_capture_rect(&mut self, rect: Rect) {
        self.capture_rect = rect.clamped();
    }

    pub fn capture_rect(&self) -> Rect {
        self.capture_rect
    }

    /// Texture-space part of the captured frame to crop.
    pub fn set_texture_rect(&mut self, rect: Rect) {
        self.texture_rect = rect.clamped();
    }

    pub fn texture_rect(&self) -> Rect {
        self.texture_rect
    }

    /// Format of buffers made by [`Pipeline::create_default_output`].
    pub fn output_format(&self) -> ImageFormat {
        self.output_format
    }

    pub fn set_output_format(&mut self, format: ImageFormat) {
        self.output_format = format;
    }

    pub fn frames_rendered(&self) -> u64 {
        self.rendered
    }

    pub fn frames_dropped(&self) -> u64 {
        self.dropped
    }

    /// Make `frame` the latest input. Replaces the previous one.
    pub fn push_frame(&mut self, frame: &CapturedFrame) -> Result<()> {
        if frame.width == 0 || frame.height == 0 {
            return Err(PipelineError::Unsupported(format!(
                "empty capture {}x{}",
                frame.width, frame.height
            )));
        }
        let needed =
            frame.bytes_per_row as usize * (frame.height as usize - 1) + frame.width as usize * 4;
        if frame.bytes_per_row < frame.width * 4 || frame.data.len() < needed {
            return Err(PipelineError::Unsupported(format!(
                "capture {}x{} with {} bytes per row and {} bytes of data",
                frame.width,
                frame.height,
                frame.bytes_per_row,
                frame.data.len()
            )));
        }
        let view = self.input.ensure(
            &mut self.device,
            frame.width,
            frame.height,
            ImageFormat::Bgra8Unorm,
            1,
        )?;
        self.device
            .write_image(view, &frame.data, frame.bytes_per_row)?;
        self.latest = Some(FrameMeta {
            width: frame.width,
            height: frame.height,
            timestamp: frame.timestamp,
        });
        Ok(())
    }

    /// Render the latest captured frame into `destination` through the
    /// active preset. Activates the fallback preset if none is active yet.
    pub fn render(&mut self, destination: &ImageView) -> Result<FrameOutcome> {
        let (Some(meta), Some(source)) = (self.latest, self.input.view()) else {
            return Ok(FrameOutcome::Skipped);
        };
        if self.registry.current_index().is_none() {
            self.registry.select(&mut self.device, FALLBACK_PRESET)?;
        }
        let Some(preset) = self.registry.current_mut() else {
            return Ok(FrameOutcome::Skipped);
        };

        let intensity = preset.transition_mut().advance();
        let frame = FrameInput {
            source,
            source_rect: self.texture_rect,
            destination: *destination,
            intensity,
        };
        let mut commands = CommandList::new(preset.name());
        let submitted = match preset.encode(&mut self.device, &frame, &mut commands) {
            Ok(()) => self.device.submit(commands).inspect_err(|_| preset.invalidate()),
            Err(e) => Err(e),
        };
        match submitted {
            Ok(()) => {
                self.rendered += 1;
                Ok(FrameOutcome::Presented)
            }
            Err(e) if e.is_transient() => {
                self.dropped += 1;
                warn!(
                    "Pipeline: dropped frame {}x{} @{:.3}: {}",
                    meta.width, meta.height, meta.timestamp, e
                );
                Ok(FrameOutcome::Dropped)
            }
            Err(e) => Err(e),
        }
    }

    /// Read a rendered 8-bit destination back for recording.
    pub fn copy_output(&mut self, destination: &ImageView) -> Result<OutputFrame> {
        let data = self.device.read_image(*destination)?;
        Ok(OutputFrame {
            width: destination.width,
            height: destination.height,
            bytes_per_row: destination.width * destination.format.bytes_per_pixel(),
            format: destination.format,
            timestamp: self.latest.map_or(0.0, |m| m.timestamp),
            data,
        })
    }

    /// Allocate a destination buffer usable by `render` and `copy_output`.
    pub fn create_output(
        &mut self,
        width: u32,
        height: u32,
        format: ImageFormat,
    ) -> Result<ImageBuffer> {
        let desc = ImageDesc::new("output", width, height, format).with_usage(ImageUsage::OUTPUT);
        self.device.create_image(&desc)
    }

    /// [`Pipeline::create_output`] in the configured output format.
    pub fn create_default_output(&mut self, width: u32, height: u32) -> Result<ImageBuffer> {
        self.create_output(width, height, self.output_format)
    }

    pub fn release_output(&mut self, buffer: ImageBuffer) {
        self.device.release_image(buffer);
    }

    /// Retire the active preset and drop the captured frame.
    pub fn shutdown(&mut self) {
        self.registry.deactivate(&mut self.device);
        self.input.release(&mut self.device);
        self.latest = None;
        info!(
            "Pipeline: shutdown after {} frames ({} dropped)",
            self.rendered, self.dropped
        );
    }
}

// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Shipped effect presets and the input stage they share.
//!
//! | index | preset          | graph                                          |
//! |-------|-----------------|------------------------------------------------|
//! | 0     | `Passthrough`   | resample                                       |
//! | -     | `Composite CRT` | crop, yiq, chroma, mask, bloom, crt, debug     |
//! | -     | `Scanlines`     | crop, crt (beam profile)                       |

mod crt;
mod passthrough;
mod scanline;

pub use crt::{CompositeCrt, CrtField, CrtParams, DEBUG_TARGETS};
pub use passthrough::{Passthrough, PassthroughField, PassthroughParams};
pub use scanline::{beam_profile, ScanlineField, ScanlineParams, Scanlines};

use crate::error::Result;
use crate::render::blur::{BlurKind, BlurStage};
use crate::render::device::RenderDevice;
use crate::render::effect::FrameInput;
use crate::render::image::{ImageFormat, ImageSlot, ImageView};
use crate::render::pass::{CommandList, PassKind};
use crate::render::resample::{ResampleFilter, ResampleStage};

/// Resample and blur kernels every preset with a crop stage needs.
pub(crate) const INPUT_KERNELS: [PassKind; 4] = [
    PassKind::ResampleBilinear,
    PassKind::ResampleLanczos,
    PassKind::Blur,
    PassKind::MipDownsample,
];

/// Input tier: crops the visible part of the capture into a working buffer
/// and smears it while the window is being dragged.
pub(crate) struct InputStage {
    crop: ImageSlot,
    resample: ResampleStage,
    drag_blur: BlurStage,
}

impl InputStage {
    pub fn new() -> Self {
        Self {
            crop: ImageSlot::new("crop"),
            resample: ResampleStage::new(ResampleFilter::Bilinear),
            drag_blur: BlurStage::new(BlurKind::Gaussian),
        }
    }

    pub fn prepare(&self, device: &mut dyn RenderDevice) -> Result<()> {
        self.resample.prepare(device)?;
        self.drag_blur.prepare(device)
    }

    /// Encode the crop at `width x height`; a drag blur of
    /// `intensity * drag_blur` pixels follows while the transition runs.
    pub fn apply(
        &mut self,
        device: &mut dyn RenderDevice,
        commands: &mut CommandList,
        frame: &FrameInput,
        width: u32,
        height: u32,
        drag_blur: f32,
    ) -> Result<ImageView> {
        let crop = self
            .crop
            .ensure(device, width, height, ImageFormat::Rgba16Float, 1)?;
        self.resample
            .apply(commands, frame.source, frame.source_rect, crop);
        let radius = frame.intensity * drag_blur;
        if frame.intensity > 0.0 && radius > 0.0 {
            self.drag_blur.set_size(radius, radius);
            self.drag_blur.apply(device, commands, crop, crop)?;
        }
        Ok(crop)
    }

    #[cfg(test)]
    pub fn view(&self) -> Option<ImageView> {
        self.crop.view()
    }

    pub fn allocations(&self) -> u64 {
        self.crop.allocations()
    }

    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.crop.release(device);
        self.drag_blur.release(device);
    }
}

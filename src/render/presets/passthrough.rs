// RustPixel
// copyright zipxing@hotmail.com 2022～2025

use crate::animated::AnimatedValue;
use crate::error::Result;
use crate::render::device::{compile_all, RenderDevice};
use crate::render::effect::{EffectPreset, FrameInput};
use crate::render::params::{choice, ParamSurface, ParamTable};
use crate::render::pass::{CommandList, PassKind};
use crate::render::resample::{ResampleFilter, ResampleStage};

crate::param_block! {
    /// Settings of the passthrough preset.
    pub struct PassthroughParams, enum PassthroughField {
        Filter filter: "Filter", "filter", default 0.0, range 0.0, 1.0, step 1.0,
            choices ["Bilinear", "Lanczos"];
    }
}

impl PassthroughParams {
    pub fn filter(&self) -> ResampleFilter {
        ResampleFilter::from_choice(choice(self.filter))
    }
}

/// Scales the visible capture straight onto the destination. Always
/// registered at index 0 and used as the fallback.
#[derive(Default)]
pub struct Passthrough {
    params: ParamTable<PassthroughParams>,
    transition: AnimatedValue<f32>,
    resample: ResampleStage,
    active: bool,
}

impl Passthrough {
    pub const NAME: &'static str = "Passthrough";

    pub fn new() -> Self {
        Self::default()
    }
}

impl EffectPreset for Passthrough {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> &dyn ParamSurface {
        &self.params
    }

    fn params_mut(&mut self) -> &mut dyn ParamSurface {
        &mut self.params
    }

    fn transition(&self) -> &AnimatedValue<f32> {
        &self.transition
    }

    fn transition_mut(&mut self) -> &mut AnimatedValue<f32> {
        &mut self.transition
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        compile_all(device, &[PassKind::ResampleBilinear, PassKind::ResampleLanczos])?;
        self.transition = AnimatedValue::default();
        self.active = true;
        Ok(())
    }

    fn retire(&mut self, _device: &mut dyn RenderDevice) {
        self.active = false;
    }

    fn encode(
        &mut self,
        _device: &mut dyn RenderDevice,
        frame: &FrameInput,
        commands: &mut CommandList,
    ) -> Result<()> {
        let params = self.params.snapshot();
        self.resample.set_filter(params.filter());
        self.resample
            .apply(commands, frame.source, frame.source_rect, frame.destination);
        Ok(())
    }
}

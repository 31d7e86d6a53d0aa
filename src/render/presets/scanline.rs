// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Scanlines only: crop, drag blur and the CRT composite with mask and
//! bloom switched off. The 8-tap profile comes from a gaussian beam instead
//! of explicit taps.

use super::{InputStage, INPUT_KERNELS};
use crate::animated::AnimatedValue;
use crate::error::Result;
use crate::render::device::{compile_all, RenderDevice};
use crate::render::effect::{EffectPreset, FrameInput};
use crate::render::image::{scaled_size, ImageFormat, ImageSlot, Rect};
use crate::render::params::{choice, ParamSurface, ParamTable};
use crate::render::pass::{CommandList, CrtUniforms, PassKind};
use crate::render::resample::{ResampleFilter, ResampleStage};
use log::warn;

crate::param_block! {
    /// Settings of the scanline preset.
    pub struct ScanlineParams, enum ScanlineField {
        InputScale input_scale: "Input Scale", "inputScale", default 0.5, range 0.125, 1.0, step 0.025;
        OutputScale output_scale: "Output Scale", "outputScale", default 1.0, range 0.5, 4.0, step 0.25;
        GammaIn gamma_in: "Input Gamma", "gammaIn", default 2.4, range 1.0, 3.0, step 0.05;
        GammaOut gamma_out: "Output Gamma", "gammaOut", default 2.2, range 1.0, 3.0, step 0.05;
        BrightnessBoost brightness_boost: "Brightness Boost", "brightnessBoost", default 1.2, range 0.5, 3.0, step 0.05;
        ScanlineStrength scanline_strength: "Scanline Strength", "scanlineStrength", default 0.8, range 0.0, 1.0, step 0.05;
        ScanlineDistance scanline_distance: "Scanline Distance", "scanlineDistance", default 3.0, range 1.0, 16.0, step 0.5;
        BeamWidth beam_width: "Beam Width", "beamWidth", default 0.5, range 0.1, 1.0, step 0.05;
        DragBlur drag_blur: "Drag Blur", "dragBlur", default 6.0, range 0.0, 32.0, step 0.5;
        OutputFilter output_filter: "Output Filter", "outputFilter", default 0.0, range 0.0, 1.0, step 1.0,
            choices ["Bilinear", "Lanczos"];
    }
}

impl ScanlineParams {
    pub fn output_filter(&self) -> ResampleFilter {
        ResampleFilter::from_choice(choice(self.output_filter))
    }
}

/// Brightness across one scanline for a gaussian beam whose width is a
/// fraction of the line pitch. Peaks at 1 in the middle.
pub fn beam_profile(width: f32) -> [f32; 8] {
    let sigma = if width.is_finite() { width.max(0.05) * 0.5 } else { 0.25 };
    let mut taps = [0.0f32; 8];
    for (i, t) in taps.iter_mut().enumerate() {
        let d = (i as f32 + 0.5) / 8.0 - 0.5;
        *t = (-(d * d) / (2.0 * sigma * sigma)).exp();
    }
    let peak = taps.iter().cloned().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for t in taps.iter_mut() {
            *t /= peak;
        }
    }
    taps
}

pub struct Scanlines {
    params: ParamTable<ScanlineParams>,
    transition: AnimatedValue<f32>,
    active: bool,
    input: InputStage,
    crt: ImageSlot,
    output: ResampleStage,
}

impl Default for Scanlines {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanlines {
    pub const NAME: &'static str = "Scanlines";

    pub fn new() -> Self {
        Self {
            params: ParamTable::new(),
            transition: AnimatedValue::default(),
            active: false,
            input: InputStage::new(),
            crt: ImageSlot::new("scanline crt"),
            output: ResampleStage::new(ResampleFilter::Bilinear),
        }
    }

    fn encode_graph(
        &mut self,
        device: &mut dyn RenderDevice,
        frame: &FrameInput,
        commands: &mut CommandList,
    ) -> Result<()> {
        let p = self.params.snapshot();
        let dst = frame.destination;

        let (iw, ih) = scaled_size(dst.width, dst.height, p.input_scale);
        let crop = self
            .input
            .apply(device, commands, frame, iw, ih, p.drag_blur)?;

        let (ow, oh) = scaled_size(dst.width, dst.height, p.output_scale);
        let crt = self
            .crt
            .ensure(device, ow, oh, ImageFormat::Rgba16Float, 1)?;
        let mut uniforms = CrtUniforms {
            gamma_in: p.gamma_in,
            gamma_out: p.gamma_out,
            brightness_boost: p.brightness_boost,
            scanline_strength: p.scanline_strength,
            scanline_rows: dst.height as f32 / p.scanline_distance.max(1.0),
            mask_strength: 0.0,
            mask_lod: 0.0,
            bloom_strength: 0.0,
            profile: [[0.0; 4]; 2],
        };
        uniforms.set_profile(&beam_profile(p.beam_width));
        commands.pass(PassKind::CrtComposite, &[crop, crop, crop], crt, &uniforms);

        self.output.set_filter(p.output_filter());
        self.output.apply(commands, crt, Rect::UNIT, dst);
        Ok(())
    }
}

impl EffectPreset for Scanlines {
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
        compile_all(device, &INPUT_KERNELS)?;
        compile_all(device, &[PassKind::CrtComposite])?;
        self.input.prepare(device)?;
        self.transition = AnimatedValue::default();
        self.active = true;
        Ok(())
    }

    fn retire(&mut self, device: &mut dyn RenderDevice) {
        self.input.release(device);
        self.crt.release(device);
        self.active = false;
    }

    fn encode(
        &mut self,
        device: &mut dyn RenderDevice,
        frame: &FrameInput,
        commands: &mut CommandList,
    ) -> Result<()> {
        let result = self.encode_graph(device, frame, commands);
        if let Err(e) = &result {
            warn!("Scanlines: frame not encoded: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::CpuDevice;
    use crate::render::image::{ImageDesc, ImageUsage};

    #[test]
    fn test_beam_profile_shape() {
        let wide = beam_profile(1.0);
        let narrow = beam_profile(0.2);
        for i in 0..4 {
            assert!((wide[i] - wide[7 - i]).abs() < 1e-6);
        }
        assert!((wide[3] - 1.0).abs() < 1e-6);
        assert!((narrow[4] - 1.0).abs() < 1e-6);
        assert!(wide[0] < wide[3]);
        assert!(narrow[0] < wide[0]);
        assert_eq!(beam_profile(f32::NAN), beam_profile(0.5));
    }

    #[test]
    fn test_graph_without_mask_or_bloom() {
        let mut device = CpuDevice::new();
        let desc =
            ImageDesc::new("src", 4, 4, ImageFormat::Bgra8Unorm).with_usage(ImageUsage::UPLOAD);
        let src = device.create_image(&desc).unwrap().view();
        let dst = device
            .create_image(&ImageDesc::new("dst", 6, 6, ImageFormat::Rgba8Unorm))
            .unwrap()
            .view();
        let mut preset = Scanlines::new();
        preset.activate(&mut device).unwrap();
        let frame = FrameInput {
            source: src,
            source_rect: Rect::UNIT,
            destination: dst,
            intensity: 0.0,
        };
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert_eq!(list.len(), 3);
        let crt = list.passes_of(PassKind::CrtComposite).next().unwrap();
        let u: CrtUniforms = crate::render::pass::read_uniforms(&crt.uniforms);
        assert_eq!(u.mask_strength, 0.0);
        assert_eq!(u.bloom_strength, 0.0);
        assert_eq!(u.scanline_rows, 2.0);
        device.submit(list).unwrap();
    }
}

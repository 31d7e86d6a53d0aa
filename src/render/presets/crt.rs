// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Composite CRT
//!
//! The full effect graph. Every frame:
//!
//! ```text
//! source ─► crop (input tier) ─► [drag blur] ─► YIQ + mips ─► chroma + mips ─┐
//!                                                                           │
//!              mask (output tier, cached) ──────────────────────────────┐   │
//!              bloom: threshold ─► gaussian @ 0.25 ──────────────────┐  │   │
//!                                                                    ▼  ▼   ▼
//!                                               crt composite (output tier)
//!                                                          │ output filter
//!                                                          ▼
//!                                  destination ◄── [debug split overwrite]
//! ```
//!
//! The input tier is `destination * input_scale`, the output tier
//! `destination * output_scale`; each tier has its own slots.

use super::{InputStage, INPUT_KERNELS};
use crate::animated::AnimatedValue;
use crate::error::Result;
use crate::render::blur::{BlurKind, BlurStage};
use crate::render::device::{compile_all, RenderDevice};
use crate::render::dotmask::{DotMaskDescriptor, DotMaskSynthesizer, MaskLayout, MaskType};
use crate::render::effect::{EffectPreset, FrameInput};
use crate::render::image::{mip_count, scaled_size, ImageFormat, ImageSlot, ImageView, Rect};
use crate::render::params::{choice, flag, ParamSurface, ParamTable};
use crate::render::pass::{
    BloomUniforms, ChromaUniforms, ColorSplitUniforms, CommandList, CrtUniforms, DebugUniforms,
    PassKind,
};
use crate::render::resample::{ResampleFilter, ResampleStage};
use log::warn;

/// Intermediates the debug view can show, by choice index.
pub const DEBUG_TARGETS: [&str; 6] = ["Crop", "YIQ", "Composite", "Mask", "Bloom", "CRT"];

/// Mip level the bloom threshold reads the composite at.
const BLOOM_LOD: f32 = 1.0;
const BLOOM_RESAMPLE: f32 = 0.25;

crate::param_block! {
    /// Settings of the composite CRT preset.
    pub struct CrtParams, enum CrtField {
        InputScale input_scale: "Input Scale", "inputScale", default 0.5, range 0.125, 1.0, step 0.025;
        OutputScale output_scale: "Output Scale", "outputScale", default 2.0, range 0.5, 4.0, step 0.25;
        GammaIn gamma_in: "Input Gamma", "gammaIn", default 2.4, range 1.0, 3.0, step 0.05;
        GammaOut gamma_out: "Output Gamma", "gammaOut", default 2.2, range 1.0, 3.0, step 0.05;
        BrightnessBoost brightness_boost: "Brightness Boost", "brightnessBoost", default 1.4, range 0.5, 3.0, step 0.05;
        OutputFilter output_filter: "Output Filter", "outputFilter", default 1.0, range 0.0, 1.0, step 1.0,
            choices ["Bilinear", "Lanczos"];

        ChromaEnabled chroma_enabled: "Chroma", "chromaEnabled", default 1.0, range 0.0, 1.0, step 1.0;
        ChromaLod chroma_lod: "Chroma Blur", "chromaLod", default 1.0, range 0.0, 4.0, step 0.25,
            enable ChromaEnabled;
        ChromaWidth chroma_width: "Chroma Width", "chromaWidth", default 2.0, range 0.0, 8.0, step 1.0,
            enable ChromaEnabled;
        ChromaDilation chroma_dilation: "Chroma Dilation", "chromaDilation", default 0.3, range 0.0, 1.0, step 0.05,
            enable ChromaEnabled;
        Saturation saturation: "Saturation", "saturation", default 1.0, range 0.0, 2.0, step 0.05,
            enable ChromaEnabled;

        MaskEnabled mask_enabled: "Dot Mask", "maskEnabled", default 1.0, range 0.0, 1.0, step 1.0;
        MaskType mask_type: "Mask Type", "maskType", default 0.0, range 0.0, 2.0, step 1.0,
            enable MaskEnabled, choices ["Aperture Grille", "Shadow Mask", "Slot Mask"];
        MaskLayout mask_layout: "Mask Layout", "maskLayout", default 1.0, range 0.0, 1.0, step 1.0,
            enable MaskEnabled, choices ["GM", "RGB"];
        MaskCellWidth mask_cell_width: "Mask Cell Width", "maskCellWidth", default 1.0, range 0.5, 8.0, step 0.5,
            enable MaskEnabled;
        MaskCellHeight mask_cell_height: "Mask Cell Height", "maskCellHeight", default 1.0, range 0.5, 8.0, step 0.5,
            enable MaskEnabled;
        MaskSaturation mask_saturation: "Mask Saturation", "maskSaturation", default 1.0, range 0.0, 1.0, step 0.05,
            enable MaskEnabled;
        MaskBrightness mask_brightness: "Mask Brightness", "maskBrightness", default 0.25, range 0.0, 1.0, step 0.05,
            enable MaskEnabled;
        MaskBlur mask_blur: "Mask Blur", "maskBlur", default 0.0, range 0.0, 8.0, step 0.5,
            enable MaskEnabled;
        MaskStrength mask_strength: "Mask Strength", "maskStrength", default 0.5, range 0.0, 1.0, step 0.05,
            enable MaskEnabled;
        MaskLod mask_lod: "Mask Level", "maskLod", default 0.0, range 0.0, 4.0, step 0.25,
            enable MaskEnabled;

        BloomEnabled bloom_enabled: "Bloom", "bloomEnabled", default 1.0, range 0.0, 1.0, step 1.0;
        BloomThreshold bloom_threshold: "Bloom Threshold", "bloomThreshold", default 0.6, range 0.0, 1.0, step 0.05,
            enable BloomEnabled;
        BloomRadius bloom_radius: "Bloom Radius", "bloomRadius", default 8.0, range 1.0, 64.0, step 1.0,
            enable BloomEnabled;
        BloomStrength bloom_strength: "Bloom Strength", "bloomStrength", default 0.3, range 0.0, 2.0, step 0.05,
            enable BloomEnabled;

        ScanlineStrength scanline_strength: "Scanline Strength", "scanlineStrength", default 0.6, range 0.0, 1.0, step 0.05;
        ScanlineDistance scanline_distance: "Scanline Distance", "scanlineDistance", default 4.0, range 1.0, 16.0, step 0.5;
        Profile0 profile0: "Profile 0", "profile0", default 0.35, range 0.0, 1.5, step 0.01;
        Profile1 profile1: "Profile 1", "profile1", default 0.7, range 0.0, 1.5, step 0.01;
        Profile2 profile2: "Profile 2", "profile2", default 0.95, range 0.0, 1.5, step 0.01;
        Profile3 profile3: "Profile 3", "profile3", default 1.0, range 0.0, 1.5, step 0.01;
        Profile4 profile4: "Profile 4", "profile4", default 1.0, range 0.0, 1.5, step 0.01;
        Profile5 profile5: "Profile 5", "profile5", default 0.95, range 0.0, 1.5, step 0.01;
        Profile6 profile6: "Profile 6", "profile6", default 0.7, range 0.0, 1.5, step 0.01;
        Profile7 profile7: "Profile 7", "profile7", default 0.35, range 0.0, 1.5, step 0.01;

        DragBlur drag_blur: "Drag Blur", "dragBlur", default 6.0, range 0.0, 32.0, step 0.5;

        DebugEnabled debug_enabled: "Debug View", "debugEnabled", default 0.0, range 0.0, 1.0, step 1.0;
        DebugMode debug_mode: "Debug Mode", "debugMode", default 0.0, range 0.0, 1.0, step 1.0,
            enable DebugEnabled, choices ["Split", "Side by Side"];
        DebugA debug_a: "Debug Left", "debugA", default 0.0, range 0.0, 5.0, step 1.0,
            enable DebugEnabled, choices ["Crop", "YIQ", "Composite", "Mask", "Bloom", "CRT"];
        DebugB debug_b: "Debug Right", "debugB", default 5.0, range 0.0, 5.0, step 1.0,
            enable DebugEnabled, choices ["Crop", "YIQ", "Composite", "Mask", "Bloom", "CRT"];
        DebugSplit debug_split: "Debug Split", "debugSplit", default 0.5, range 0.0, 1.0, step 0.01,
            enable DebugEnabled;
    }
}

impl CrtParams {
    pub fn output_filter(&self) -> ResampleFilter {
        ResampleFilter::from_choice(choice(self.output_filter))
    }

    pub fn mask_type(&self) -> MaskType {
        MaskType::from_choice(choice(self.mask_type))
    }

    pub fn mask_layout(&self) -> MaskLayout {
        MaskLayout::from_choice(choice(self.mask_layout))
    }

    pub fn chroma_enabled(&self) -> bool {
        flag(self.chroma_enabled)
    }

    pub fn mask_enabled(&self) -> bool {
        flag(self.mask_enabled)
    }

    pub fn bloom_enabled(&self) -> bool {
        flag(self.bloom_enabled)
    }

    pub fn debug_enabled(&self) -> bool {
        flag(self.debug_enabled)
    }

    pub fn profile(&self) -> [f32; 8] {
        [
            self.profile0,
            self.profile1,
            self.profile2,
            self.profile3,
            self.profile4,
            self.profile5,
            self.profile6,
            self.profile7,
        ]
    }

    pub fn mask_descriptor(&self) -> DotMaskDescriptor {
        DotMaskDescriptor {
            mask_type: self.mask_type(),
            layout: self.mask_layout(),
            cell_width: self.mask_cell_width,
            cell_height: self.mask_cell_height,
            saturation: self.mask_saturation,
            brightness: self.mask_brightness,
            blur: self.mask_blur,
        }
    }
}

pub struct CompositeCrt {
    params: ParamTable<CrtParams>,
    transition: AnimatedValue<f32>,
    active: bool,
    input: InputStage,
    yiq: ImageSlot,
    composite: ImageSlot,
    bloom_bright: ImageSlot,
    bloom: ImageSlot,
    crt: ImageSlot,
    bloom_blur: BlurStage,
    output: ResampleStage,
    mask: DotMaskSynthesizer,
}

impl Default for CompositeCrt {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeCrt {
    pub const NAME: &'static str = "Composite CRT";

    pub fn new() -> Self {
        let mut bloom_blur = BlurStage::new(BlurKind::Gaussian);
        bloom_blur.set_resample(BLOOM_RESAMPLE, BLOOM_RESAMPLE);
        Self {
            params: ParamTable::new(),
            transition: AnimatedValue::default(),
            active: false,
            input: InputStage::new(),
            yiq: ImageSlot::new("yiq"),
            composite: ImageSlot::new("composite"),
            bloom_bright: ImageSlot::new("bloom bright"),
            bloom: ImageSlot::new("bloom"),
            crt: ImageSlot::new("crt"),
            bloom_blur,
            output: ResampleStage::new(ResampleFilter::Lanczos),
            mask: DotMaskSynthesizer::new(),
        }
    }

    pub fn param_block(&self) -> &CrtParams {
        self.params.block()
    }

    pub fn set_field(&mut self, field: CrtField, value: f32) -> f32 {
        self.params.set_field(field, value)
    }

    /// Allocation count of the input-tier buffers (crop, yiq, composite).
    pub fn input_tier_allocations(&self) -> u64 {
        self.input.allocations() + self.yiq.allocations() + self.composite.allocations()
    }

    /// Allocation count of the output-tier buffers (bloom, crt).
    pub fn output_tier_allocations(&self) -> u64 {
        self.bloom_bright.allocations() + self.bloom.allocations() + self.crt.allocations()
    }

    pub fn mask_regenerations(&self) -> u64 {
        self.mask.regenerations()
    }

    fn encode_graph(
        &mut self,
        device: &mut dyn RenderDevice,
        frame: &FrameInput,
        commands: &mut CommandList,
    ) -> Result<()> {
        let p = self.params.snapshot();
        let dst = frame.destination;

        // input tier
        let (iw, ih) = scaled_size(dst.width, dst.height, p.input_scale);
        let crop = self
            .input
            .apply(device, commands, frame, iw, ih, p.drag_blur)?;

        let mips = mip_count(iw, ih);
        let yiq = self
            .yiq
            .ensure(device, iw, ih, ImageFormat::Rgba16Float, mips)?;
        let split = ColorSplitUniforms {
            luma_gain: 1.0,
            chroma_gain: 1.0,
            _padding: [0.0; 2],
        };
        commands.pass(PassKind::ColorSplit, &[crop], yiq, &split);
        commands.generate_mips(yiq);

        let composite = self
            .composite
            .ensure(device, iw, ih, ImageFormat::Rgba16Float, mips)?;
        let chroma = if p.chroma_enabled() {
            ChromaUniforms {
                texel: [1.0 / iw as f32, 1.0 / ih as f32],
                chroma_lod: p.chroma_lod,
                taps: p.chroma_width,
                dilation: p.chroma_dilation,
                saturation: p.saturation,
                _padding: [0.0; 2],
            }
        } else {
            // plain YIQ -> RGB recombination
            ChromaUniforms {
                texel: [1.0 / iw as f32, 1.0 / ih as f32],
                chroma_lod: 0.0,
                taps: 0.0,
                dilation: 0.0,
                saturation: 1.0,
                _padding: [0.0; 2],
            }
        };
        commands.pass(PassKind::Chroma, &[yiq], composite, &chroma);
        commands.generate_mips(composite);

        // output tier
        let (ow, oh) = scaled_size(dst.width, dst.height, p.output_scale);
        let mask = if p.mask_enabled() {
            self.mask
                .ensure(device, commands, &p.mask_descriptor(), ow, oh)?;
            self.mask.mask()
        } else {
            None
        };

        let bloom = if p.bloom_enabled() {
            let bright = self
                .bloom_bright
                .ensure(device, ow, oh, ImageFormat::Rgba16Float, 1)?;
            let bloom = self
                .bloom
                .ensure(device, ow, oh, ImageFormat::Rgba16Float, 1)?;
            let threshold = BloomUniforms {
                threshold: p.bloom_threshold,
                lod: BLOOM_LOD,
                _padding: [0.0; 2],
            };
            commands.pass(PassKind::BloomThreshold, &[composite], bright, &threshold);
            self.bloom_blur.set_size(p.bloom_radius, p.bloom_radius);
            self.bloom_blur.apply(device, commands, bright, bloom)?;
            Some(bloom)
        } else {
            None
        };

        let crt = self
            .crt
            .ensure(device, ow, oh, ImageFormat::Rgba16Float, 1)?;
        let mut uniforms = CrtUniforms {
            gamma_in: p.gamma_in,
            gamma_out: p.gamma_out,
            brightness_boost: p.brightness_boost,
            scanline_strength: p.scanline_strength,
            scanline_rows: dst.height as f32 / p.scanline_distance.max(1.0),
            mask_strength: if mask.is_some() { p.mask_strength } else { 0.0 },
            mask_lod: p.mask_lod,
            bloom_strength: if bloom.is_some() { p.bloom_strength } else { 0.0 },
            profile: [[0.0; 4]; 2],
        };
        uniforms.set_profile(&p.profile());
        commands.pass(
            PassKind::CrtComposite,
            &[composite, mask.unwrap_or(composite), bloom.unwrap_or(composite)],
            crt,
            &uniforms,
        );

        self.output.set_filter(p.output_filter());
        self.output.apply(commands, crt, Rect::UNIT, dst);

        if p.debug_enabled() {
            let targets = [Some(crop), Some(yiq), Some(composite), mask, bloom, Some(crt)];
            let pick = |v: f32| -> ImageView {
                targets
                    .get(choice(v))
                    .copied()
                    .flatten()
                    .unwrap_or(crt)
            };
            let debug = DebugUniforms {
                mode: choice(p.debug_mode) as f32,
                split: p.debug_split,
                _padding: [0.0; 2],
            };
            commands.pass(
                PassKind::DebugSplit,
                &[pick(p.debug_a), pick(p.debug_b)],
                dst,
                &debug,
            );
        }
        Ok(())
    }
}

impl EffectPreset for CompositeCrt {
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
        compile_all(
            device,
            &[
                PassKind::ColorSplit,
                PassKind::Chroma,
                PassKind::BloomThreshold,
                PassKind::CrtComposite,
                PassKind::DebugSplit,
            ],
        )?;
        self.input.prepare(device)?;
        self.bloom_blur.prepare(device)?;
        self.mask.prepare(device)?;
        self.transition = AnimatedValue::default();
        self.active = true;
        Ok(())
    }

    fn retire(&mut self, device: &mut dyn RenderDevice) {
        self.input.release(device);
        self.yiq.release(device);
        self.composite.release(device);
        self.bloom_bright.release(device);
        self.bloom.release(device);
        self.crt.release(device);
        self.bloom_blur.release(device);
        self.mask.release(device);
        self.active = false;
    }

    fn invalidate(&mut self) {
        self.mask.invalidate();
    }

    fn encode(
        &mut self,
        device: &mut dyn RenderDevice,
        frame: &FrameInput,
        commands: &mut CommandList,
    ) -> Result<()> {
        let result = self.encode_graph(device, frame, commands);
        if let Err(e) = &result {
            // the list is discarded, so nothing the mask encoded will run
            self.mask.invalidate();
            warn!("CompositeCrt: frame not encoded: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::CpuDevice;
    use crate::render::image::{ImageDesc, ImageUsage};
    use crate::render::params::ParamBlock;

    fn setup(device: &mut CpuDevice, w: u32, h: u32) -> FrameInput {
        let desc =
            ImageDesc::new("src", 8, 8, ImageFormat::Bgra8Unorm).with_usage(ImageUsage::UPLOAD);
        let src = device.create_image(&desc).unwrap();
        device
            .write_image(src.view(), &[40u8, 120, 200, 255].repeat(64), 32)
            .unwrap();
        let dst = device
            .create_image(&ImageDesc::new("dst", w, h, ImageFormat::Rgba8Unorm))
            .unwrap();
        FrameInput {
            source: src.view(),
            source_rect: Rect::UNIT,
            destination: dst.view(),
            intensity: 0.0,
        }
    }

    fn kinds(list: &CommandList) -> Vec<PassKind> {
        list.commands()
            .iter()
            .filter_map(|c| match c {
                crate::render::pass::Command::Pass(p) => Some(p.kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_schema_defaults() {
        let p = CrtParams::default();
        assert_eq!(p.profile(), [0.35, 0.7, 0.95, 1.0, 1.0, 0.95, 0.7, 0.35]);
        assert_eq!(p.mask_type(), MaskType::ApertureGrille);
        assert_eq!(p.mask_layout(), MaskLayout::Rgb);
        assert_eq!(p.output_filter(), ResampleFilter::Lanczos);
        for spec in CrtParams::schema() {
            assert!((spec.sanitize(spec.default) - spec.default).abs() < 1e-5, "{}", spec.key);
        }
    }

    #[test]
    fn test_full_graph_order() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 8, 8);
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        let order = kinds(&list);
        let pos = |k: PassKind| order.iter().position(|x| *x == k).unwrap();
        assert!(pos(PassKind::ResampleBilinear) < pos(PassKind::ColorSplit));
        assert!(pos(PassKind::ColorSplit) < pos(PassKind::Chroma));
        assert!(pos(PassKind::Chroma) < pos(PassKind::DotMaskExpand));
        assert!(pos(PassKind::DotMaskExpand) < pos(PassKind::BloomThreshold));
        assert!(pos(PassKind::BloomThreshold) < pos(PassKind::CrtComposite));
        assert_eq!(*order.last().unwrap(), PassKind::ResampleLanczos);
        assert!(!order.contains(&PassKind::DebugSplit));
        device.submit(list).unwrap();
        assert_eq!(preset.mask_regenerations(), 1);
    }

    #[test]
    fn test_mask_is_cached_between_frames() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 8, 8);
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        for _ in 0..3 {
            let mut list = CommandList::new("frame");
            preset.encode(&mut device, &frame, &mut list).unwrap();
            device.submit(list).unwrap();
        }
        assert_eq!(preset.mask_regenerations(), 1);
        preset.set_field(CrtField::MaskSaturation, 0.5);
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert_eq!(preset.mask_regenerations(), 2);
    }

    #[test]
    fn test_rejected_list_regenerates_mask() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 8, 8);
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        device.fail_submissions(1);
        let mut list = CommandList::new("rejected");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert!(device.submit(list).is_err());
        preset.invalidate();

        let mut list = CommandList::new("retry");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert_eq!(list.passes_of(PassKind::DotMaskExpand).count(), 1);
        device.submit(list).unwrap();
        assert_eq!(preset.mask_regenerations(), 2);
    }

    #[test]
    fn test_disabled_stages_are_skipped() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 8, 8);
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        preset.set_field(CrtField::MaskEnabled, 0.0);
        preset.set_field(CrtField::BloomEnabled, 0.0);
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        let order = kinds(&list);
        assert!(!order.contains(&PassKind::DotMaskExpand));
        assert!(!order.contains(&PassKind::BloomThreshold));
        let crt = list.passes_of(PassKind::CrtComposite).next().unwrap();
        let u: CrtUniforms = crate::render::pass::read_uniforms(&crt.uniforms);
        assert_eq!(u.mask_strength, 0.0);
        assert_eq!(u.bloom_strength, 0.0);
    }

    #[test]
    fn test_scale_tiers_are_independent() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 16, 16);
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        let (input, output) = (preset.input_tier_allocations(), preset.output_tier_allocations());

        preset.set_field(CrtField::InputScale, 0.25);
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert_eq!(preset.input_tier_allocations(), input + 3);
        assert_eq!(preset.output_tier_allocations(), output);
        assert_eq!(preset.mask_regenerations(), 1);

        preset.set_field(CrtField::OutputScale, 1.0);
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert_eq!(preset.input_tier_allocations(), input + 3);
        assert_eq!(preset.output_tier_allocations(), output + 3);
        assert_eq!(preset.mask_regenerations(), 2);
    }

    #[test]
    fn test_debug_split_overwrites_destination() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 8, 8);
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        preset.set_field(CrtField::DebugEnabled, 1.0);
        preset.set_field(CrtField::DebugA, 0.0);
        preset.set_field(CrtField::DebugB, 3.0);
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        let debug = list.passes_of(PassKind::DebugSplit).next().unwrap();
        assert_eq!(debug.output, frame.destination);
        assert_eq!(debug.inputs[0], preset.input.view().unwrap());
        assert_eq!(Some(debug.inputs[1]), preset.mask.mask());
    }

    #[test]
    fn test_retire_releases_everything() {
        let mut device = CpuDevice::new();
        let frame = setup(&mut device, 8, 8);
        let live = device.stats().live_images;
        let mut preset = CompositeCrt::new();
        preset.activate(&mut device).unwrap();
        let mut list = CommandList::new("frame");
        preset.encode(&mut device, &frame, &mut list).unwrap();
        assert!(device.stats().live_images > live);
        preset.retire(&mut device);
        assert_eq!(device.stats().live_images, live);
        assert!(!preset.is_active());
    }
}

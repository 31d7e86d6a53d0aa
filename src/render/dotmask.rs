// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Dot-Mask Synthesizer
//!
//! Builds the phosphor mask a CRT composite multiplies against:
//!
//! ```text
//! DotMaskDescriptor ──► palette (HSB) ──► template ──► RGBA8 tile (CPU)
//!        │                                                │ upload
//!        └── cache key                                    ▼
//!                          mip chain ◄── blur ◄── DotMaskExpand into target
//! ```
//!
//! Templates are written with one char per tile texel:
//! `r`, `g`, `b` primaries, `m` magenta, `k` the neutral black level.

use crate::error::Result;
use crate::render::blur::{BlurKind, BlurStage};
use crate::render::color::hsb_to_rgb;
use crate::render::device::{compile_all, RenderDevice};
use crate::render::image::{mip_count, ImageFormat, ImageSlot, ImageUsage, ImageView};
use crate::render::pass::{CommandList, DotMaskUniforms, PassKind};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskType {
    /// Vertical phosphor stripes
    #[default]
    ApertureGrille,
    /// Staggered triads
    ShadowMask,
    /// Interleaved slots
    SlotMask,
}

impl MaskType {
    pub const NAMES: [&'static str; 3] = ["Aperture Grille", "Shadow Mask", "Slot Mask"];

    pub fn from_choice(index: usize) -> Self {
        match index {
            0 => MaskType::ApertureGrille,
            1 => MaskType::ShadowMask,
            _ => MaskType::SlotMask,
        }
    }
}

/// Phosphor layout: green/magenta pairs or red/green/blue plus black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskLayout {
    Gm,
    #[default]
    Rgb,
}

impl MaskLayout {
    pub const NAMES: [&'static str; 2] = ["GM", "RGB"];

    pub fn from_choice(index: usize) -> Self {
        match index {
            0 => MaskLayout::Gm,
            _ => MaskLayout::Rgb,
        }
    }
}

/// Everything the mask image depends on; the cache key of the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotMaskDescriptor {
    pub mask_type: MaskType,
    pub layout: MaskLayout,
    /// Output pixels per tile texel, horizontally
    pub cell_width: f32,
    /// Output pixels per tile texel, vertically
    pub cell_height: f32,
    pub saturation: f32,
    /// Level of the `k` phosphor
    pub brightness: f32,
    /// Gaussian width applied after expansion, 0 for none
    pub blur: f32,
}

impl Default for DotMaskDescriptor {
    fn default() -> Self {
        Self {
            mask_type: MaskType::ApertureGrille,
            layout: MaskLayout::Rgb,
            cell_width: 1.0,
            cell_height: 1.0,
            saturation: 1.0,
            brightness: 0.0,
            blur: 0.0,
        }
    }
}

const APERTURE_GM: [&str; 2] = ["gm", "gm"];
const APERTURE_RGB: [&str; 4] = ["rgbk", "rgbk", "rgbk", "rgbk"];
const SHADOW_GM: [&str; 8] = [
    "gmkk", "gmkk", "gmkk", "kkkk", "kkgm", "kkgm", "kkgm", "kkkk",
];
const SHADOW_RGB: [&str; 9] = [
    "rgbkkk", "rgbkkk", "kkkkkk", "kkrgbk", "kkrgbk", "kkkkkk", "bkkkrg", "bkkkrg", "kkkkkk",
];
const SLOT_GM: [&str; 4] = ["gmgm", "gmkk", "gmgm", "kkgm"];
const SLOT_RGB: [&str; 6] = [
    "rgbkrgbk", "rgbkrgbk", "kkkkrgbk", "rgbkrgbk", "rgbkrgbk", "rgbkkkkk",
];

/// Pattern rows of one mask type and layout.
pub fn template(mask_type: MaskType, layout: MaskLayout) -> &'static [&'static str] {
    match (mask_type, layout) {
        (MaskType::ApertureGrille, MaskLayout::Gm) => &APERTURE_GM,
        (MaskType::ApertureGrille, MaskLayout::Rgb) => &APERTURE_RGB,
        (MaskType::ShadowMask, MaskLayout::Gm) => &SHADOW_GM,
        (MaskType::ShadowMask, MaskLayout::Rgb) => &SHADOW_RGB,
        (MaskType::SlotMask, MaskLayout::Gm) => &SLOT_GM,
        (MaskType::SlotMask, MaskLayout::Rgb) => &SLOT_RGB,
    }
}

/// The five phosphor colors of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub red: [f32; 3],
    pub green: [f32; 3],
    pub blue: [f32; 3],
    pub magenta: [f32; 3],
    pub black: [f32; 3],
}

impl Palette {
    pub fn new(desc: &DotMaskDescriptor) -> Self {
        let s = desc.saturation;
        Self {
            red: hsb_to_rgb(0.0, s, 1.0),
            green: hsb_to_rgb(120.0, s, 1.0),
            blue: hsb_to_rgb(240.0, s, 1.0),
            magenta: hsb_to_rgb(300.0, s, 1.0),
            black: hsb_to_rgb(0.0, 0.0, desc.brightness),
        }
    }

    fn color(&self, c: char) -> [f32; 3] {
        match c {
            'r' => self.red,
            'g' => self.green,
            'b' => self.blue,
            'm' => self.magenta,
            _ => self.black,
        }
    }
}

/// Rasterize the tile of `desc` into tightly packed RGBA8 rows.
pub fn rasterize(desc: &DotMaskDescriptor) -> (u32, u32, Vec<u8>) {
    let rows = template(desc.mask_type, desc.layout);
    let palette = Palette::new(desc);
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
    let height = rows.len() as u32;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for row in rows {
        for c in row.chars() {
            let [r, g, b] = palette.color(c);
            data.extend_from_slice(&[
                (r.clamp(0.0, 1.0) * 255.0).round() as u8,
                (g.clamp(0.0, 1.0) * 255.0).round() as u8,
                (b.clamp(0.0, 1.0) * 255.0).round() as u8,
                255,
            ]);
        }
    }
    (width, height, data)
}

fn cell_extent(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        1.0
    }
}

/// Owns the mask buffer of one preset and rebuilds it only on change.
pub struct DotMaskSynthesizer {
    cached: Option<DotMaskDescriptor>,
    tile: ImageSlot,
    target: ImageSlot,
    blur: BlurStage,
    regenerations: u64,
}

impl Default for DotMaskSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DotMaskSynthesizer {
    pub fn new() -> Self {
        Self {
            cached: None,
            tile: ImageSlot::with_usage("dotmask tile", ImageUsage::UPLOAD),
            target: ImageSlot::new("dotmask"),
            blur: BlurStage::new(BlurKind::Gaussian),
            regenerations: 0,
        }
    }

    pub fn prepare(&self, device: &mut dyn RenderDevice) -> Result<()> {
        compile_all(device, &[PassKind::DotMaskExpand, PassKind::MipDownsample])?;
        self.blur.prepare(device)
    }

    /// Make sure the mask of `desc` at `width x height` is encoded.
    /// Returns true when the expensive path ran. The cache assumes
    /// `commands` gets submitted; call [`Self::invalidate`] if it is not.
    pub fn ensure(
        &mut self,
        device: &mut dyn RenderDevice,
        commands: &mut CommandList,
        desc: &DotMaskDescriptor,
        width: u32,
        height: u32,
    ) -> Result<bool> {
        let allocations = self.target.allocations();
        let target = self.target.ensure(
            device,
            width,
            height,
            ImageFormat::Rgba16Float,
            mip_count(width, height),
        )?;
        if self.target.allocations() == allocations && self.cached.as_ref() == Some(desc) {
            return Ok(false);
        }
        // stays invalid until every step below has been encoded
        self.cached = None;

        let (tile_w, tile_h, pixels) = rasterize(desc);
        let tile = self
            .tile
            .ensure(device, tile_w, tile_h, ImageFormat::Rgba8Unorm, 1)?;
        device.write_image(tile, &pixels, tile_w * 4)?;

        let uniforms = DotMaskUniforms {
            tile_size: [tile_w as f32, tile_h as f32],
            cell_size: [cell_extent(desc.cell_width), cell_extent(desc.cell_height)],
        };
        commands.pass(PassKind::DotMaskExpand, &[tile], target, &uniforms);
        if desc.blur > 0.0 {
            self.blur.set_size(desc.blur, desc.blur);
            self.blur.apply(device, commands, target, target)?;
        }
        commands.generate_mips(target);

        self.cached = Some(*desc);
        self.regenerations += 1;
        debug!(
            "DotMaskSynthesizer: {:?}/{:?} tile {}x{} -> {}x{}",
            desc.mask_type, desc.layout, tile_w, tile_h, width, height
        );
        Ok(true)
    }

    pub fn mask(&self) -> Option<ImageView> {
        self.target.view()
    }

    /// How many times the mask was rebuilt.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    /// Force the next `ensure` to rebuild, e.g. after a frame was dropped.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.tile.release(device);
        self.target.release(device);
        self.blur.release(device);
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::CpuDevice;

    fn run(
        synth: &mut DotMaskSynthesizer,
        device: &mut CpuDevice,
        desc: &DotMaskDescriptor,
        w: u32,
        h: u32,
    ) -> bool {
        let mut list = CommandList::new("frame");
        let rebuilt = synth.ensure(device, &mut list, desc, w, h).unwrap();
        device.submit(list).unwrap();
        rebuilt
    }

    #[test]
    fn test_template_geometry() {
        let heights = [
            (MaskType::ApertureGrille, MaskLayout::Gm, 2),
            (MaskType::ApertureGrille, MaskLayout::Rgb, 4),
            (MaskType::ShadowMask, MaskLayout::Gm, 8),
            (MaskType::ShadowMask, MaskLayout::Rgb, 9),
            (MaskType::SlotMask, MaskLayout::Gm, 4),
            (MaskType::SlotMask, MaskLayout::Rgb, 6),
        ];
        for (t, l, rows) in heights {
            let tpl = template(t, l);
            assert_eq!(tpl.len(), rows, "{:?} {:?}", t, l);
            let w = tpl[0].len();
            assert!(tpl.iter().all(|r| r.len() == w));
            assert!(tpl
                .iter()
                .all(|r| r.chars().all(|c| "rgbmk".contains(c))));
        }
    }

    #[test]
    fn test_palette_follows_saturation_and_brightness() {
        let desc = DotMaskDescriptor {
            saturation: 0.5,
            brightness: 0.25,
            ..Default::default()
        };
        let p = Palette::new(&desc);
        assert_eq!(p.red, [1.0, 0.5, 0.5]);
        assert_eq!(p.black, [0.25, 0.25, 0.25]);
        let (w, h, data) = rasterize(&DotMaskDescriptor::default());
        assert_eq!((w, h), (4, 4));
        assert_eq!(&data[..16], &[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn test_cache_idempotence() {
        let mut device = CpuDevice::new();
        let mut synth = DotMaskSynthesizer::new();
        synth.prepare(&mut device).unwrap();
        let desc = DotMaskDescriptor::default();
        assert!(run(&mut synth, &mut device, &desc, 16, 8));
        let uploads = device.stats().uploads;
        assert!(!run(&mut synth, &mut device, &desc, 16, 8));
        assert_eq!(synth.regenerations(), 1);
        assert_eq!(device.stats().uploads, uploads);
    }

    #[test]
    fn test_any_field_change_regenerates() {
        let mut device = CpuDevice::new();
        let mut synth = DotMaskSynthesizer::new();
        synth.prepare(&mut device).unwrap();
        let base = DotMaskDescriptor::default();
        run(&mut synth, &mut device, &base, 16, 8);
        let variants = [
            DotMaskDescriptor { saturation: base.saturation - 1e-4, ..base },
            DotMaskDescriptor { brightness: 0.1, ..base },
            DotMaskDescriptor { cell_width: 2.0, ..base },
            DotMaskDescriptor { cell_height: 3.0, ..base },
            DotMaskDescriptor { blur: 2.0, ..base },
            DotMaskDescriptor { layout: MaskLayout::Gm, ..base },
            DotMaskDescriptor { mask_type: MaskType::SlotMask, ..base },
        ];
        let mut expected = 1;
        for v in variants {
            assert!(run(&mut synth, &mut device, &v, 16, 8), "{:?}", v);
            expected += 1;
            assert_eq!(synth.regenerations(), expected);
            // back to base rebuilds too
            assert!(run(&mut synth, &mut device, &base, 16, 8));
            expected += 1;
        }
    }

    #[test]
    fn test_resize_regenerates() {
        let mut device = CpuDevice::new();
        let mut synth = DotMaskSynthesizer::new();
        synth.prepare(&mut device).unwrap();
        let desc = DotMaskDescriptor::default();
        run(&mut synth, &mut device, &desc, 16, 8);
        assert!(run(&mut synth, &mut device, &desc, 20, 8));
        assert_eq!(synth.mask().unwrap().size(), (20, 8));
        assert_eq!(synth.mask().unwrap().mip_levels, 5);
    }

    #[test]
    fn test_expansion_tiles_cells() {
        let mut device = CpuDevice::new();
        let mut synth = DotMaskSynthesizer::new();
        synth.prepare(&mut device).unwrap();
        let desc = DotMaskDescriptor {
            cell_width: 2.0,
            ..Default::default()
        };
        run(&mut synth, &mut device, &desc, 16, 2);
        let texels = device.read_texels(synth.mask().unwrap()).unwrap();
        let expected = [
            [1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
        ];
        for x in 0..16 {
            let t = texels[x];
            assert_eq!([t[0], t[1], t[2]], expected[x % 8], "x={}", x);
        }
    }

    #[test]
    fn test_failed_allocation_retries_next_frame() {
        let mut device = CpuDevice::new();
        let mut synth = DotMaskSynthesizer::new();
        synth.prepare(&mut device).unwrap();
        let desc = DotMaskDescriptor::default();
        device.fail_allocations(1);
        let mut list = CommandList::new("frame");
        assert!(synth.ensure(&mut device, &mut list, &desc, 8, 8).is_err());
        assert!(run(&mut synth, &mut device, &desc, 8, 8));
        assert_eq!(synth.regenerations(), 1);
    }
}

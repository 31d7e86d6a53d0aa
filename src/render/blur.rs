// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Blur Stage
//!
//! Separable box / tent / gaussian blur. With a resample factor of `(1, 1)`
//! the blur runs directly: a horizontal pass into an owned temp buffer, then
//! a vertical pass into the destination. Any other factor first resamples
//! the source into an owned buffer of `source size * factor`, blurs that, and
//! resamples the result back up, which keeps wide radii cheap.

use crate::error::Result;
use crate::render::device::{compile_all, RenderDevice};
use crate::render::image::{scaled_size, ImageFormat, ImageSlot, ImageView, Rect};
use crate::render::pass::{BlurUniforms, CommandList, PassKind};
use crate::render::resample::{ResampleFilter, ResampleStage};

/// Upper bound of taps on each side of the center.
pub const MAX_BLUR_RADIUS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlurKind {
    Box,
    Tent,
    #[default]
    Gaussian,
}

impl BlurKind {
    fn code(self) -> f32 {
        match self {
            BlurKind::Box => 0.0,
            BlurKind::Tent => 1.0,
            BlurKind::Gaussian => 2.0,
        }
    }

    pub fn from_choice(index: usize) -> Self {
        match index {
            0 => BlurKind::Box,
            1 => BlurKind::Tent,
            _ => BlurKind::Gaussian,
        }
    }
}

/// Taps on each side of the center and the gaussian sigma for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurTaps {
    pub radius: u32,
    pub sigma: f32,
}

fn sanitize(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        1.0
    }
}

pub struct BlurStage {
    kind: BlurKind,
    size: (f32, f32),
    resample: (f32, f32),
    temp: ImageSlot,
    down: ImageSlot,
    down_temp: ImageSlot,
    resampler: ResampleStage,
}

impl BlurStage {
    pub fn new(kind: BlurKind) -> Self {
        Self {
            kind,
            size: (1.0, 1.0),
            resample: (1.0, 1.0),
            temp: ImageSlot::new("blur temp"),
            down: ImageSlot::new("blur down"),
            down_temp: ImageSlot::new("blur down temp"),
            resampler: ResampleStage::new(ResampleFilter::Bilinear),
        }
    }

    pub fn kind(&self) -> BlurKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BlurKind) {
        self.kind = kind;
    }

    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    /// Kernel width and height in pixels. Values `<= 0` act as 1.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.size = (sanitize(width), sanitize(height));
    }

    pub fn resample(&self) -> (f32, f32) {
        self.resample
    }

    /// Work at `source size * factor` when the factor is not `(1, 1)`.
    pub fn set_resample(&mut self, fx: f32, fy: f32) {
        self.resample = (sanitize(fx).min(1.0), sanitize(fy).min(1.0));
    }

    /// Taps for a kernel extent: box and tent widths are forced odd, the
    /// gaussian derives `sigma = width / 4`.
    pub fn taps(&self, extent: f32) -> BlurTaps {
        let extent = sanitize(extent);
        match self.kind {
            BlurKind::Box | BlurKind::Tent => {
                let width = (extent.round() as u32).max(1) | 1;
                BlurTaps {
                    radius: (width / 2).min(MAX_BLUR_RADIUS),
                    sigma: width as f32 / 4.0,
                }
            }
            BlurKind::Gaussian => BlurTaps {
                radius: ((extent / 2.0).floor() as u32).min(MAX_BLUR_RADIUS),
                sigma: extent / 4.0,
            },
        }
    }

    pub fn prepare(&self, device: &mut dyn RenderDevice) -> Result<()> {
        compile_all(device, &[PassKind::Blur])?;
        self.resampler.prepare(device)
    }

    fn uniforms(&self, direction: [f32; 2], input: ImageView, extent: f32) -> BlurUniforms {
        let taps = self.taps(extent);
        BlurUniforms {
            direction,
            texel: [1.0 / input.width as f32, 1.0 / input.height as f32],
            radius: taps.radius as f32,
            sigma: taps.sigma,
            kind: self.kind.code(),
            _padding: 0.0,
        }
    }

    fn encode_separable(
        &self,
        commands: &mut CommandList,
        source: ImageView,
        temp: ImageView,
        destination: ImageView,
    ) {
        let horizontal = self.uniforms([1.0, 0.0], source, self.size.0);
        commands.pass(PassKind::Blur, &[source], temp, &horizontal);
        let vertical = self.uniforms([0.0, 1.0], temp, self.size.1);
        commands.pass(PassKind::Blur, &[temp], destination, &vertical);
    }

    /// Blur `source` into `destination`. The two may be the same buffer.
    pub fn apply(
        &mut self,
        device: &mut dyn RenderDevice,
        commands: &mut CommandList,
        source: ImageView,
        destination: ImageView,
    ) -> Result<()> {
        if self.resample == (1.0, 1.0) {
            let temp = self.temp.ensure(
                device,
                source.width,
                source.height,
                ImageFormat::Rgba16Float,
                1,
            )?;
            self.encode_separable(commands, source, temp, destination);
            return Ok(());
        }

        let (w, h) = (
            scaled_size(source.width, 1, self.resample.0).0,
            scaled_size(1, source.height, self.resample.1).1,
        );
        let down = self.down.ensure(device, w, h, ImageFormat::Rgba16Float, 1)?;
        let down_temp = self
            .down_temp
            .ensure(device, w, h, ImageFormat::Rgba16Float, 1)?;
        self.resampler.apply(commands, source, Rect::UNIT, down);
        self.encode_separable(commands, down, down_temp, down);
        self.resampler.apply(commands, down, Rect::UNIT, destination);
        Ok(())
    }

    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        self.temp.release(device);
        self.down.release(device);
        self.down_temp.release(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::CpuDevice;
    use crate::render::image::{ImageDesc, ImageUsage};

    fn upload(device: &mut CpuDevice, w: u32, h: u32, pixels: &[u8]) -> ImageView {
        let desc =
            ImageDesc::new("src", w, h, ImageFormat::Rgba8Unorm).with_usage(ImageUsage::UPLOAD);
        let img = device.create_image(&desc).unwrap();
        device.write_image(img.view(), pixels, w * 4).unwrap();
        img.view()
    }

    fn pattern(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        for y in 0..h {
            for x in 0..w {
                out.extend_from_slice(&[(x * 40) as u8, (y * 60) as u8, ((x + y) * 20) as u8, 255]);
            }
        }
        out
    }

    #[test]
    fn test_odd_widths_and_sigma() {
        let mut stage = BlurStage::new(BlurKind::Box);
        assert_eq!(stage.taps(4.0).radius, 2);
        assert_eq!(stage.taps(5.0).radius, 2);
        assert_eq!(stage.taps(1.0).radius, 0);
        assert_eq!(stage.taps(-3.0).radius, 0);
        assert_eq!(stage.taps(f32::NAN).radius, 0);
        assert_eq!(stage.taps(1000.0).radius, MAX_BLUR_RADIUS);
        stage.set_kind(BlurKind::Gaussian);
        let t = stage.taps(8.0);
        assert_eq!(t.radius, 4);
        assert_eq!(t.sigma, 2.0);
    }

    #[test]
    fn test_size_one_is_identity() {
        for kind in [BlurKind::Box, BlurKind::Tent, BlurKind::Gaussian] {
            let mut device = CpuDevice::new();
            let pixels = pattern(5, 4);
            let src = upload(&mut device, 5, 4, &pixels);
            let dst = device
                .create_image(&ImageDesc::new("dst", 5, 4, ImageFormat::Rgba8Unorm))
                .unwrap()
                .view();
            let mut stage = BlurStage::new(kind);
            stage.set_size(1.0, 1.0);
            stage.set_resample(1.0, 1.0);
            stage.prepare(&mut device).unwrap();
            let mut list = CommandList::new("frame");
            stage.apply(&mut device, &mut list, src, dst).unwrap();
            device.submit(list).unwrap();
            assert_eq!(device.read_image(dst).unwrap(), pixels, "{:?}", kind);
        }
    }

    #[test]
    fn test_flat_field_survives_wide_blur() {
        let mut device = CpuDevice::new();
        let pixels: Vec<u8> = [90u8, 150, 30, 255].repeat(16 * 8);
        let src = upload(&mut device, 16, 8, &pixels);
        let dst = device
            .create_image(&ImageDesc::new("dst", 16, 8, ImageFormat::Rgba8Unorm))
            .unwrap()
            .view();
        let mut stage = BlurStage::new(BlurKind::Gaussian);
        stage.set_size(9.0, 9.0);
        stage.set_resample(0.5, 0.5);
        stage.prepare(&mut device).unwrap();
        let mut list = CommandList::new("frame");
        stage.apply(&mut device, &mut list, src, dst).unwrap();
        device.submit(list).unwrap();
        assert_eq!(device.read_image(dst).unwrap(), pixels);
    }

    #[test]
    fn test_downscale_path_uses_smaller_buffer() {
        let mut device = CpuDevice::new();
        let src = upload(&mut device, 16, 8, &pattern(16, 8));
        let mut stage = BlurStage::new(BlurKind::Tent);
        stage.set_size(3.0, 3.0);
        stage.set_resample(0.25, 0.5);
        stage.prepare(&mut device).unwrap();
        let mut list = CommandList::new("frame");
        stage.apply(&mut device, &mut list, src, src).unwrap();
        let down = stage.down.view().unwrap();
        assert_eq!(down.size(), (4, 4));
        // down, two blur passes, up
        assert_eq!(list.len(), 4);
        assert!(stage.temp.view().is_none());
    }

    #[test]
    fn test_blur_spreads_a_point() {
        let mut device = CpuDevice::new();
        let mut pixels = [0u8, 0, 0, 255].repeat(9);
        pixels[4 * 4] = 255;
        let src = upload(&mut device, 9, 1, &pixels);
        let dst = device
            .create_image(&ImageDesc::new("dst", 9, 1, ImageFormat::Rgba16Float))
            .unwrap()
            .view();
        let mut stage = BlurStage::new(BlurKind::Box);
        stage.set_size(3.0, 1.0);
        stage.prepare(&mut device).unwrap();
        let mut list = CommandList::new("frame");
        stage.apply(&mut device, &mut list, src, dst).unwrap();
        device.submit(list).unwrap();
        let texels = device.read_texels(dst).unwrap();
        for x in 3..=5 {
            assert!((texels[x][0] - 1.0 / 3.0).abs() < 1e-5);
        }
        assert!(texels[2][0].abs() < 1e-5);
        assert!(texels[6][0].abs() < 1e-5);
    }
}

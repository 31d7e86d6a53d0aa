// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # CPU Reference Device
//!
//! Runs every kernel on the CPU over `f32` RGBA texels, following the same
//! sampling rules as the WGSL kernels: texel centers at `(i + 0.5) / size`,
//! clamp-to-edge, bilinear within a level and linear between levels.
//! Writes to 8-bit formats are quantized the way a unorm render target
//! would store them.
//!
//! Besides being the headless backend, it carries a few hooks for tests:
//! [`CpuDevice::fail_compile`], [`CpuDevice::fail_allocations`] and
//! [`CpuDevice::fail_submissions`] simulate missing shaders, resource
//! exhaustion and rejected command lists, and [`CpuDevice::stats`] exposes
//! counters for allocations, uploads and executed passes.

use crate::error::{PipelineError, Result};
use crate::render::color::{luma, rgb_to_yiq, yiq_to_rgb};
use crate::render::device::RenderDevice;
use crate::render::image::{ImageBuffer, ImageDesc, ImageFormat, ImageId, ImageView};
use crate::render::pass::{
    read_uniforms, BloomUniforms, BlurUniforms, ChromaUniforms, ColorSplitUniforms, Command,
    CommandList, CrtUniforms, DebugUniforms, DotMaskUniforms, PassInvocation, PassKind,
    ResampleUniforms,
};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

type Texel = [f32; 4];

/// Counters exposed for tests and diagnostics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuStats {
    pub live_images: usize,
    pub allocations: u64,
    pub uploads: u64,
    pub readbacks: u64,
    pub submissions: u64,
    pub passes: u64,
    pub mip_generations: u64,
}

struct Level {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl Level {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![[0.0; 4]; (width * height) as usize],
        }
    }

    fn fetch(&self, x: i64, y: i64) -> Texel {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.texels[y * self.width as usize + x]
    }

    fn sample(&self, uv: [f32; 2]) -> Texel {
        let px = uv[0] * self.width as f32 - 0.5;
        let py = uv[1] * self.height as f32 - 0.5;
        let x0 = px.floor();
        let y0 = py.floor();
        let fx = px - x0;
        let fy = py - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);
        let top = mix(self.fetch(x0, y0), self.fetch(x0 + 1, y0), fx);
        let bottom = mix(self.fetch(x0, y0 + 1), self.fetch(x0 + 1, y0 + 1), fx);
        mix(top, bottom, fy)
    }
}

struct CpuImage {
    format: ImageFormat,
    levels: Vec<Level>,
}

impl CpuImage {
    fn new(desc: &ImageDesc) -> Self {
        let levels = (0..desc.mip_levels)
            .map(|i| Level::new((desc.width >> i).max(1), (desc.height >> i).max(1)))
            .collect();
        Self {
            format: desc.format,
            levels,
        }
    }

    fn base(&self) -> &Level {
        &self.levels[0]
    }

    /// Trilinear sample; `lod` is clamped to the available levels.
    fn sample(&self, uv: [f32; 2], lod: f32) -> Texel {
        let max_lod = (self.levels.len() - 1) as f32;
        let lod = if lod.is_finite() {
            lod.clamp(0.0, max_lod)
        } else {
            0.0
        };
        let l0 = lod.floor() as usize;
        let l1 = (l0 + 1).min(self.levels.len() - 1);
        let a = self.levels[l0].sample(uv);
        if l1 == l0 {
            return a;
        }
        mix(a, self.levels[l1].sample(uv), lod - l0 as f32)
    }
}

/// Headless device executing kernels on the CPU.
pub struct CpuDevice {
    next_id: u64,
    images: HashMap<ImageId, CpuImage>,
    compiled: HashSet<PassKind>,
    broken_kernels: HashSet<PassKind>,
    failing_allocations: u32,
    failing_submissions: u32,
    stats: CpuStats,
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuDevice {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            images: HashMap::new(),
            compiled: HashSet::new(),
            broken_kernels: HashSet::new(),
            failing_allocations: 0,
            failing_submissions: 0,
            stats: CpuStats::default(),
        }
    }

    /// Make every later `compile(kind)` fail, as if the shader were missing.
    pub fn fail_compile(&mut self, kind: PassKind) {
        self.broken_kernels.insert(kind);
        self.compiled.remove(&kind);
    }

    /// Make the next `count` allocations fail.
    pub fn fail_allocations(&mut self, count: u32) {
        self.failing_allocations = count;
    }

    /// Reject the next `count` submissions whole, before any pass runs.
    pub fn fail_submissions(&mut self, count: u32) {
        self.failing_submissions = count;
    }

    pub fn stats(&self) -> CpuStats {
        CpuStats {
            live_images: self.images.len(),
            ..self.stats
        }
    }

    /// Level 0 texels as floats, for formats that cannot be read back as bytes.
    pub fn read_texels(&self, image: ImageView) -> Result<Vec<[f32; 4]>> {
        let img = self.get(image.id)?;
        Ok(img.base().texels.clone())
    }

    /// Texels of one mip level.
    pub fn read_level(&self, image: ImageView, level: usize) -> Result<Vec<[f32; 4]>> {
        let img = self.get(image.id)?;
        img.levels
            .get(level)
            .map(|l| l.texels.clone())
            .ok_or_else(|| PipelineError::Unsupported(format!("mip level {}", level)))
    }

    fn get(&self, id: ImageId) -> Result<&CpuImage> {
        self.images.get(&id).ok_or(PipelineError::UnknownImage(id))
    }

    fn run_pass(&mut self, pass: &PassInvocation) -> Result<()> {
        if !self.compiled.contains(&pass.kind) {
            return Err(PipelineError::Setup(format!(
                "kernel {} used before compile",
                pass.kind.name()
            )));
        }
        let (width, height) = {
            let out = self.get(pass.output.id)?;
            (out.base().width, out.base().height)
        };
        let texels = {
            let mut inputs = Vec::with_capacity(pass.inputs.len());
            for view in &pass.inputs {
                inputs.push(self.get(view.id)?);
            }
            if inputs.is_empty() {
                return Err(PipelineError::Unsupported(format!(
                    "{} pass without inputs",
                    pass.kind.name()
                )));
            }
            shade_pass(pass, &inputs, width, height)
        };
        let out = self
            .images
            .get_mut(&pass.output.id)
            .ok_or(PipelineError::UnknownImage(pass.output.id))?;
        let quantize = out.format.is_unorm8();
        let base = &mut out.levels[0];
        for (dst, src) in base.texels.iter_mut().zip(texels) {
            *dst = if quantize { quantize8(src) } else { src };
        }
        self.stats.passes += 1;
        Ok(())
    }

    fn generate_mips(&mut self, id: ImageId) -> Result<()> {
        let img = self
            .images
            .get_mut(&id)
            .ok_or(PipelineError::UnknownImage(id))?;
        let quantize = img.format.is_unorm8();
        for i in 1..img.levels.len() {
            let (prev, rest) = img.levels.split_at_mut(i);
            let src = &prev[i - 1];
            let dst = &mut rest[0];
            let (w, h) = (dst.width, dst.height);
            for y in 0..h {
                for x in 0..w {
                    let uv = [(x as f32 + 0.5) / w as f32, (y as f32 + 0.5) / h as f32];
                    let t = src.sample(uv);
                    dst.texels[(y * w + x) as usize] = if quantize { quantize8(t) } else { t };
                }
            }
        }
        self.stats.mip_generations += 1;
        Ok(())
    }
}

impl RenderDevice for CpuDevice {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<ImageBuffer> {
        if self.failing_allocations > 0 {
            self.failing_allocations -= 1;
            warn!(
                "CpuDevice: simulated allocation failure for {} ({}x{})",
                desc.label, desc.width, desc.height
            );
            return Err(PipelineError::Allocation {
                label: desc.label,
                width: desc.width,
                height: desc.height,
            });
        }
        let id = ImageId(self.next_id);
        self.next_id += 1;
        self.images.insert(id, CpuImage::new(desc));
        self.stats.allocations += 1;
        Ok(ImageBuffer::new(id, desc))
    }

    fn release_image(&mut self, image: ImageBuffer) {
        if self.images.remove(&image.id()).is_none() {
            debug!("CpuDevice: release of unknown image {:?}", image.id());
        }
    }

    fn write_image(&mut self, image: ImageView, data: &[u8], bytes_per_row: u32) -> Result<()> {
        if !image.format.is_unorm8() {
            return Err(PipelineError::Unsupported(format!(
                "upload to {:?}",
                image.format
            )));
        }
        let img = self
            .images
            .get_mut(&image.id)
            .ok_or(PipelineError::UnknownImage(image.id))?;
        let base = &mut img.levels[0];
        let (w, h) = (base.width as usize, base.height as usize);
        let row = (bytes_per_row as usize).max(w * 4);
        if data.len() < row * (h - 1) + w * 4 {
            return Err(PipelineError::Unsupported(format!(
                "upload of {} bytes into {}x{}",
                data.len(),
                w,
                h
            )));
        }
        let bgra = img.format == ImageFormat::Bgra8Unorm;
        for y in 0..h {
            for x in 0..w {
                let o = y * row + x * 4;
                let px = &data[o..o + 4];
                let (r, g, b, a) = if bgra {
                    (px[2], px[1], px[0], px[3])
                } else {
                    (px[0], px[1], px[2], px[3])
                };
                base.texels[y * w + x] = [
                    r as f32 / 255.0,
                    g as f32 / 255.0,
                    b as f32 / 255.0,
                    a as f32 / 255.0,
                ];
            }
        }
        self.stats.uploads += 1;
        Ok(())
    }

    fn read_image(&mut self, image: ImageView) -> Result<Vec<u8>> {
        if !image.format.is_unorm8() {
            return Err(PipelineError::Unsupported(format!(
                "readback of {:?}",
                image.format
            )));
        }
        let img = self.get(image.id)?;
        let bgra = img.format == ImageFormat::Bgra8Unorm;
        let mut out = Vec::with_capacity(img.base().texels.len() * 4);
        for t in &img.base().texels {
            let [r, g, b, a] = t.map(to_byte);
            if bgra {
                out.extend_from_slice(&[b, g, r, a]);
            } else {
                out.extend_from_slice(&[r, g, b, a]);
            }
        }
        self.stats.readbacks += 1;
        Ok(out)
    }

    fn compile(&mut self, kind: PassKind) -> Result<()> {
        if self.broken_kernels.contains(&kind) {
            return Err(PipelineError::Setup(format!(
                "kernel {} failed to compile",
                kind.name()
            )));
        }
        self.compiled.insert(kind);
        Ok(())
    }

    fn is_compiled(&self, kind: PassKind) -> bool {
        self.compiled.contains(&kind)
    }

    fn submit(&mut self, commands: CommandList) -> Result<()> {
        if self.failing_submissions > 0 {
            self.failing_submissions -= 1;
            return Err(PipelineError::Device(format!(
                "{:?} rejected",
                commands.label()
            )));
        }
        for command in commands.commands() {
            match command {
                Command::Pass(pass) => self.run_pass(pass)?,
                Command::GenerateMips(view) => self.generate_mips(view.id)?,
            }
        }
        self.stats.submissions += 1;
        Ok(())
    }
}

fn shade_pass(pass: &PassInvocation, inputs: &[&CpuImage], width: u32, height: u32) -> Vec<Texel> {
    let input = |i: usize| inputs[i.min(inputs.len() - 1)];
    let bytes = &pass.uniforms;
    match pass.kind {
        PassKind::ResampleBilinear => {
            let u: ResampleUniforms = read_uniforms(bytes);
            shade(width, height, |uv| {
                input(0).sample(
                    [
                        u.src_offset[0] + uv[0] * u.src_scale[0],
                        u.src_offset[1] + uv[1] * u.src_scale[1],
                    ],
                    u.lod,
                )
            })
        }
        PassKind::ResampleLanczos => {
            let u: ResampleUniforms = read_uniforms(bytes);
            shade(width, height, |uv| lanczos_sample(input(0).base(), &u, uv))
        }
        PassKind::Blur => {
            let u: BlurUniforms = read_uniforms(bytes);
            let radius = u.radius.max(0.0) as i32;
            shade(width, height, |uv| {
                let mut sum = [0.0; 4];
                let mut wsum = 0.0;
                for k in -radius..=radius {
                    let fk = k as f32;
                    let w = blur_weight(&u, fk);
                    let t = input(0).sample(
                        [
                            uv[0] + u.direction[0] * u.texel[0] * fk,
                            uv[1] + u.direction[1] * u.texel[1] * fk,
                        ],
                        0.0,
                    );
                    sum = add(sum, scale(t, w));
                    wsum += w;
                }
                scale(sum, 1.0 / wsum.max(1.0e-6))
            })
        }
        PassKind::ColorSplit => {
            let u: ColorSplitUniforms = read_uniforms(bytes);
            shade(width, height, |uv| {
                let c = input(0).sample(uv, 0.0);
                let [y, i, q] = rgb_to_yiq([c[0], c[1], c[2]]);
                [y * u.luma_gain, i * u.chroma_gain, q * u.chroma_gain, 1.0]
            })
        }
        PassKind::Chroma => {
            let u: ChromaUniforms = read_uniforms(bytes);
            let taps = u.taps.max(0.0) as i32;
            let step = u.texel[0] * u.chroma_lod.max(0.0).exp2();
            shade(width, height, |uv| {
                let y = input(0).sample(uv, 0.0)[0];
                let mut avg = [0.0f32; 2];
                let mut best = [0.0f32; 2];
                let mut best_mag = -1.0f32;
                for k in -taps..=taps {
                    let t = input(0).sample([uv[0] + k as f32 * step, uv[1]], u.chroma_lod);
                    avg[0] += t[1];
                    avg[1] += t[2];
                    let mag = t[1] * t[1] + t[2] * t[2];
                    if mag > best_mag {
                        best_mag = mag;
                        best = [t[1], t[2]];
                    }
                }
                let n = (2 * taps + 1) as f32;
                let i = lerp(avg[0] / n, best[0], u.dilation) * u.saturation;
                let q = lerp(avg[1] / n, best[1], u.dilation) * u.saturation;
                let rgb = yiq_to_rgb([y, i, q]);
                [rgb[0].max(0.0), rgb[1].max(0.0), rgb[2].max(0.0), 1.0]
            })
        }
        PassKind::DotMaskExpand => {
            let u: DotMaskUniforms = read_uniforms(bytes);
            let tile = input(0).base();
            let cell_w = u.cell_size[0].max(1.0e-3);
            let cell_h = u.cell_size[1].max(1.0e-3);
            shade_px(width, height, |x, y| {
                let cx = ((x as f32 + 0.5) / cell_w).floor() as i64;
                let cy = ((y as f32 + 0.5) / cell_h).floor() as i64;
                tile.fetch(
                    cx.rem_euclid(u.tile_size[0].max(1.0) as i64),
                    cy.rem_euclid(u.tile_size[1].max(1.0) as i64),
                )
            })
        }
        PassKind::BloomThreshold => {
            let u: BloomUniforms = read_uniforms(bytes);
            let knee = (1.0 - u.threshold).max(1.0e-3);
            shade(width, height, |uv| {
                let c = input(0).sample(uv, u.lod);
                let f = (luma([c[0], c[1], c[2]]) - u.threshold).max(0.0) / knee;
                [c[0] * f, c[1] * f, c[2] * f, 1.0]
            })
        }
        PassKind::CrtComposite => {
            let u: CrtUniforms = read_uniforms(bytes);
            shade(width, height, |uv| crt_shade(&u, input(0), input(1), input(2), uv))
        }
        PassKind::DebugSplit => {
            let u: DebugUniforms = read_uniforms(bytes);
            shade(width, height, |uv| {
                if u.mode >= 0.5 {
                    if uv[0] < 0.5 {
                        input(0).sample([uv[0] * 2.0, uv[1]], 0.0)
                    } else {
                        input(1).sample([(uv[0] - 0.5) * 2.0, uv[1]], 0.0)
                    }
                } else if uv[0] < u.split {
                    input(0).sample(uv, 0.0)
                } else {
                    input(1).sample(uv, 0.0)
                }
            })
        }
        PassKind::MipDownsample => shade(width, height, |uv| input(0).sample(uv, 0.0)),
    }
}

fn crt_shade(
    u: &CrtUniforms,
    source: &CpuImage,
    mask: &CpuImage,
    bloom: &CpuImage,
    uv: [f32; 2],
) -> Texel {
    let c = source.sample(uv, 0.0);
    let mut lin = [0.0f32; 3];
    for i in 0..3 {
        lin[i] = c[i].clamp(0.0, 1.0).powf(u.gamma_in);
    }

    let phase = (uv[1] * u.scanline_rows).fract();
    let pos = (phase * 8.0 - 0.5).clamp(0.0, 7.0);
    let i0 = pos.floor() as usize;
    let i1 = (i0 + 1).min(7);
    let profile = lerp(u.profile_tap(i0), u.profile_tap(i1), pos - i0 as f32);
    let scan = lerp(1.0, profile, u.scanline_strength);

    let m = mask.sample(uv, u.mask_lod);
    let b = bloom.sample(uv, 0.0);
    let mut out = [0.0f32; 4];
    for i in 0..3 {
        let masked = lerp(1.0, m[i], u.mask_strength);
        let v = (lin[i] * scan * masked + b[i] * u.bloom_strength) * u.brightness_boost;
        out[i] = v.max(0.0).powf(1.0 / u.gamma_out.max(1.0e-3));
    }
    out[3] = 1.0;
    out
}

fn lanczos(x: f32, a: f32) -> f32 {
    let ax = x.abs();
    if ax < 1.0e-5 {
        return 1.0;
    }
    if ax >= a {
        return 0.0;
    }
    let px = std::f32::consts::PI * x;
    a * px.sin() * (px / a).sin() / (px * px)
}

fn lanczos_sample(src: &Level, u: &ResampleUniforms, uv: [f32; 2]) -> Texel {
    let a = if u.radius > 0.0 { u.radius } else { 2.0 };
    let p = [
        (u.src_offset[0] + uv[0] * u.src_scale[0]) * u.src_size[0] - 0.5,
        (u.src_offset[1] + uv[1] * u.src_scale[1]) * u.src_size[1] - 0.5,
    ];
    let stretch = [
        (u.src_scale[0] * u.src_size[0] / u.dst_size[0].max(1.0)).clamp(1.0, 2.0),
        (u.src_scale[1] * u.src_size[1] / u.dst_size[1].max(1.0)).clamp(1.0, 2.0),
    ];
    let base = [p[0].floor(), p[1].floor()];
    let mut sum = [0.0; 4];
    let mut wsum = 0.0;
    for j in -4..=4 {
        for i in -4..=4 {
            let tx = base[0] + i as f32;
            let ty = base[1] + j as f32;
            let w = lanczos((tx - p[0]) / stretch[0], a) * lanczos((ty - p[1]) / stretch[1], a);
            if w != 0.0 {
                sum = add(sum, scale(src.fetch(tx as i64, ty as i64), w));
                wsum += w;
            }
        }
    }
    if wsum.abs() < 1.0e-5 {
        return src.sample([
            (p[0] + 0.5) / u.src_size[0].max(1.0),
            (p[1] + 0.5) / u.src_size[1].max(1.0),
        ]);
    }
    scale(sum, 1.0 / wsum)
}

fn blur_weight(u: &BlurUniforms, k: f32) -> f32 {
    if u.kind < 0.5 {
        1.0
    } else if u.kind < 1.5 {
        u.radius + 1.0 - k.abs()
    } else {
        let sigma = u.sigma.max(1.0e-3);
        (-(k * k) / (2.0 * sigma * sigma)).exp()
    }
}

fn shade(width: u32, height: u32, f: impl Fn([f32; 2]) -> Texel) -> Vec<Texel> {
    shade_px(width, height, |x, y| {
        f([
            (x as f32 + 0.5) / width as f32,
            (y as f32 + 0.5) / height as f32,
        ])
    })
}

fn shade_px(width: u32, height: u32, f: impl Fn(u32, u32) -> Texel) -> Vec<Texel> {
    let mut out = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            out.push(f(x, y));
        }
    }
    out
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn mix(a: Texel, b: Texel, t: f32) -> Texel {
    [
        lerp(a[0], b[0], t),
        lerp(a[1], b[1], t),
        lerp(a[2], b[2], t),
        lerp(a[3], b[3], t),
    ]
}

fn add(a: Texel, b: Texel) -> Texel {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]]
}

fn scale(a: Texel, s: f32) -> Texel {
    [a[0] * s, a[1] * s, a[2] * s, a[3] * s]
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn quantize8(t: Texel) -> Texel {
    t.map(|v| to_byte(v) as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::ImageUsage;
    use bytemuck::Zeroable;

    fn rgba_image(device: &mut CpuDevice, w: u32, h: u32, pixels: &[u8]) -> ImageView {
        let desc =
            ImageDesc::new("src", w, h, ImageFormat::Rgba8Unorm).with_usage(ImageUsage::UPLOAD);
        let img = device.create_image(&desc).unwrap();
        device.write_image(img.view(), pixels, w * 4).unwrap();
        img.view()
    }

    #[test]
    fn test_bgra_upload_and_readback_keep_byte_order() {
        let mut device = CpuDevice::new();
        let desc = ImageDesc::new("frame", 2, 1, ImageFormat::Bgra8Unorm);
        let img = device.create_image(&desc).unwrap();
        let data = [10u8, 20, 30, 255, 40, 50, 60, 128];
        device.write_image(img.view(), &data, 8).unwrap();
        assert_eq!(device.read_image(img.view()).unwrap(), data.to_vec());
        let texels = device.read_texels(img.view()).unwrap();
        assert!((texels[0][0] - 30.0 / 255.0).abs() < 1e-6);
        assert!((texels[0][2] - 10.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_padded_rows_upload() {
        let mut device = CpuDevice::new();
        let img = device
            .create_image(&ImageDesc::new("frame", 1, 2, ImageFormat::Rgba8Unorm))
            .unwrap();
        // 8 bytes per row, only the first 4 are pixels
        let data = [1u8, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8];
        device.write_image(img.view(), &data, 8).unwrap();
        assert_eq!(device.read_image(img.view()).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(device.write_image(img.view(), &data[..8], 8).is_err());
    }

    #[test]
    fn test_float_images_reject_byte_io() {
        let mut device = CpuDevice::new();
        let img = device
            .create_image(&ImageDesc::new("work", 2, 2, ImageFormat::Rgba16Float))
            .unwrap();
        assert!(device.read_image(img.view()).is_err());
        assert!(device.write_image(img.view(), &[0; 16], 8).is_err());
    }

    #[test]
    fn test_pass_requires_compile() {
        let mut device = CpuDevice::new();
        let src = rgba_image(&mut device, 1, 1, &[255, 0, 0, 255]);
        let dst = device
            .create_image(&ImageDesc::new("dst", 1, 1, ImageFormat::Rgba8Unorm))
            .unwrap();
        let mut list = CommandList::new("frame");
        list.pass(PassKind::MipDownsample, &[src], dst.view(), &BloomUniforms::zeroed());
        assert!(matches!(
            device.submit(list.clone()),
            Err(PipelineError::Setup(_))
        ));
        device.compile(PassKind::MipDownsample).unwrap();
        device.submit(list).unwrap();
        assert_eq!(device.read_image(dst.view()).unwrap(), vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_broken_kernel_never_compiles() {
        let mut device = CpuDevice::new();
        device.fail_compile(PassKind::Chroma);
        assert!(device.compile(PassKind::Chroma).is_err());
        assert!(!device.is_compiled(PassKind::Chroma));
        assert!(device.compile(PassKind::Blur).is_ok());
    }

    #[test]
    fn test_mips_average_levels() {
        let mut device = CpuDevice::new();
        let desc = ImageDesc::new("pyr", 2, 2, ImageFormat::Rgba16Float).with_mips(2);
        let img = device.create_image(&desc).unwrap();
        let src = rgba_image(
            &mut device,
            2,
            2,
            &[255, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 0, 0, 255],
        );
        device.compile(PassKind::MipDownsample).unwrap();
        let mut list = CommandList::new("frame");
        list.pass(PassKind::MipDownsample, &[src], img.view(), &BloomUniforms::zeroed());
        list.generate_mips(img.view());
        device.submit(list).unwrap();
        let top = device.read_level(img.view(), 1).unwrap();
        assert_eq!(top.len(), 1);
        assert!((top[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(device.stats().mip_generations, 1);
    }

    #[test]
    fn test_lanczos_weights() {
        assert_eq!(lanczos(0.0, 2.0), 1.0);
        assert!(lanczos(1.0, 2.0).abs() < 1e-6);
        assert_eq!(lanczos(2.5, 2.0), 0.0);
        assert!(lanczos(0.5, 2.0) > 0.5);
    }
}

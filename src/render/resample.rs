// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Resample Stage
//!
//! Scales a normalized sub-rectangle of a source buffer onto the whole of a
//! destination buffer. The mapping is carried in the uniform block as
//! `uv_src = offset + uv_dst * scale`, so every kernel samples the same way.

use crate::error::Result;
use crate::render::device::{compile_all, RenderDevice};
use crate::render::image::{ImageView, Rect};
use crate::render::pass::{CommandList, PassKind, ResampleUniforms};

/// Lobes of the windowed sinc.
pub const LANCZOS_LOBES: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    /// 2x2 tent sampling
    #[default]
    Bilinear,
    /// Windowed sinc, sharper on upscale, alias-free on downscale
    Lanczos,
}

impl ResampleFilter {
    pub fn kind(self) -> PassKind {
        match self {
            ResampleFilter::Bilinear => PassKind::ResampleBilinear,
            ResampleFilter::Lanczos => PassKind::ResampleLanczos,
        }
    }

    /// Map a choice index from a parameter table, `0` bilinear, `1` lanczos.
    pub fn from_choice(index: usize) -> Self {
        match index {
            0 => ResampleFilter::Bilinear,
            _ => ResampleFilter::Lanczos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResampleStage {
    filter: ResampleFilter,
    lod: f32,
}

impl ResampleStage {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter, lod: 0.0 }
    }

    pub fn filter(&self) -> ResampleFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ResampleFilter) {
        self.filter = filter;
    }

    /// Mip level read by the bilinear kernel; the sinc kernel always reads
    /// level 0.
    pub fn set_lod(&mut self, lod: f32) {
        self.lod = if lod.is_finite() { lod.max(0.0) } else { 0.0 };
    }

    /// Compile the kernel of the current filter.
    pub fn prepare(&self, device: &mut dyn RenderDevice) -> Result<()> {
        compile_all(device, &[self.filter.kind()])
    }

    /// Uniform block mapping `source_rect` of `source` onto `destination`.
    pub fn uniforms(
        &self,
        source: ImageView,
        source_rect: Rect,
        destination: ImageView,
    ) -> ResampleUniforms {
        let rect = source_rect.clamped();
        ResampleUniforms {
            src_offset: [rect.x, rect.y],
            src_scale: [rect.width, rect.height],
            src_size: [source.width as f32, source.height as f32],
            dst_size: [destination.width as f32, destination.height as f32],
            lod: self.lod,
            radius: LANCZOS_LOBES,
            _padding: [0.0; 2],
        }
    }

    pub fn apply(
        &self,
        commands: &mut CommandList,
        source: ImageView,
        source_rect: Rect,
        destination: ImageView,
    ) {
        let uniforms = self.uniforms(source, source_rect, destination);
        commands.pass(self.filter.kind(), &[source], destination, &uniforms);
    }

    /// Same operation over independent `(source, rect, destination)` jobs.
    pub fn apply_batch(&self, commands: &mut CommandList, jobs: &[(ImageView, Rect, ImageView)]) {
        for (source, rect, destination) in jobs {
            self.apply(commands, *source, *rect, *destination);
        }
    }
}

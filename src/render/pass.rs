// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # Pass Encoding
//!
//! Every GPU step of the pipeline is one [`PassKind`] kernel drawn over a
//! full output image. A pass binds up to [`MAX_PASS_INPUTS`] sampled inputs,
//! one output, and a uniform block copied by value from one of the
//! `#[repr(C)]` structs below. Field order and padding of those structs
//! mirror the WGSL `Params` declarations in `shader_source.rs`.
//!
//! A frame is one [`CommandList`]; devices execute it in encoding order, so a
//! pass always sees the outputs of every pass encoded before it.

use crate::render::image::{ImageId, ImageView};
use bytemuck::{Pod, Zeroable};

/// Sampled texture slots per pass (t0..t3 in WGSL).
pub const MAX_PASS_INPUTS: usize = 4;

/// Kernels a device must be able to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    ResampleBilinear,
    ResampleLanczos,
    Blur,
    ColorSplit,
    Chroma,
    DotMaskExpand,
    BloomThreshold,
    CrtComposite,
    DebugSplit,
    MipDownsample,
}

impl PassKind {
    pub const ALL: [PassKind; 10] = [
        PassKind::ResampleBilinear,
        PassKind::ResampleLanczos,
        PassKind::Blur,
        PassKind::ColorSplit,
        PassKind::Chroma,
        PassKind::DotMaskExpand,
        PassKind::BloomThreshold,
        PassKind::CrtComposite,
        PassKind::DebugSplit,
        PassKind::MipDownsample,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PassKind::ResampleBilinear => "resample_bilinear",
            PassKind::ResampleLanczos => "resample_lanczos",
            PassKind::Blur => "blur",
            PassKind::ColorSplit => "color_split",
            PassKind::Chroma => "chroma",
            PassKind::DotMaskExpand => "dotmask_expand",
            PassKind::BloomThreshold => "bloom_threshold",
            PassKind::CrtComposite => "crt_composite",
            PassKind::DebugSplit => "debug_split",
            PassKind::MipDownsample => "mip_downsample",
        }
    }
}

/// Maps the destination onto `src_offset + uv * src_scale` of the source.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ResampleUniforms {
    pub src_offset: [f32; 2],
    pub src_scale: [f32; 2],
    pub src_size: [f32; 2],
    pub dst_size: [f32; 2],
    pub lod: f32,
    /// Lanczos lobes
    pub radius: f32,
    pub _padding: [f32; 2],
}

/// One direction of a separable blur.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    pub direction: [f32; 2],
    pub texel: [f32; 2],
    /// taps on each side of the center
    pub radius: f32,
    pub sigma: f32,
    /// 0 box, 1 tent, 2 gaussian
    pub kind: f32,
    pub _padding: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorSplitUniforms {
    pub luma_gain: f32,
    pub chroma_gain: f32,
    pub _padding: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ChromaUniforms {
    pub texel: [f32; 2],
    pub chroma_lod: f32,
    pub taps: f32,
    pub dilation: f32,
    pub saturation: f32,
    pub _padding: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DotMaskUniforms {
    pub tile_size: [f32; 2],
    pub cell_size: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BloomUniforms {
    pub threshold: f32,
    pub lod: f32,
    pub _padding: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CrtUniforms {
    pub gamma_in: f32,
    pub gamma_out: f32,
    pub brightness_boost: f32,
    pub scanline_strength: f32,
    pub scanline_rows: f32,
    pub mask_strength: f32,
    pub mask_lod: f32,
    pub bloom_strength: f32,
    /// 8-tap brightness profile across one scanline, as two vec4
    pub profile: [[f32; 4]; 2],
}

impl CrtUniforms {
    pub fn set_profile(&mut self, taps: &[f32; 8]) {
        self.profile[0].copy_from_slice(&taps[..4]);
        self.profile[1].copy_from_slice(&taps[4..]);
    }

    pub fn profile_tap(&self, i: usize) -> f32 {
        let i = i.min(7);
        self.profile[i / 4][i % 4]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DebugUniforms {
    /// 0 split at `split`, 1 side by side
    pub mode: f32,
    pub split: f32,
    pub _padding: [f32; 2],
}

/// One encoded kernel invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct PassInvocation {
    pub kind: PassKind,
    pub inputs: Vec<ImageView>,
    pub output: ImageView,
    pub uniforms: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pass(PassInvocation),
    /// Rebuild levels 1.. of an image from its level 0
    GenerateMips(ImageView),
}

/// Everything one frame asks the device to do, in order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandList {
    label: String,
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            commands: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Encode `kind` reading `inputs` and writing level 0 of `output`.
    /// Inputs beyond `MAX_PASS_INPUTS` are dropped.
    pub fn pass<U: Pod>(
        &mut self,
        kind: PassKind,
        inputs: &[ImageView],
        output: ImageView,
        uniforms: &U,
    ) {
        let inputs = inputs.iter().take(MAX_PASS_INPUTS).copied().collect();
        self.commands.push(Command::Pass(PassInvocation {
            kind,
            inputs,
            output,
            uniforms: bytemuck::bytes_of(uniforms).to_vec(),
        }));
    }

    pub fn generate_mips(&mut self, image: ImageView) {
        if image.mip_levels > 1 {
            self.commands.push(Command::GenerateMips(image));
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Passes of one kind, in encoding order.
    pub fn passes_of(&self, kind: PassKind) -> impl Iterator<Item = &PassInvocation> {
        self.commands.iter().filter_map(move |c| match c {
            Command::Pass(p) if p.kind == kind => Some(p),
            _ => None,
        })
    }

    /// Ids written by this list, for ordering checks.
    pub fn writes(&self) -> Vec<ImageId> {
        self.commands
            .iter()
            .map(|c| match c {
                Command::Pass(p) => p.output.id,
                Command::GenerateMips(v) => v.id,
            })
            .collect()
    }
}

/// Decode a uniform block recorded by [`CommandList::pass`].
pub fn read_uniforms<U: Pod>(bytes: &[u8]) -> U {
    let size = std::mem::size_of::<U>();
    if bytes.len() >= size {
        bytemuck::pod_read_unaligned(&bytes[..size])
    } else {
        U::zeroed()
    }
}

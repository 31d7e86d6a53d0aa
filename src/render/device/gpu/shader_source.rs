// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! # WGSL Kernel Sources
//!
//! Every kernel is [`COMMON_PRELUDE`] followed by its own `Params` block and
//! `fs_main`. The prelude draws one fullscreen triangle without vertex
//! buffers and declares the shared bind group layout:
//!
//! | binding | resource                  |
//! |---------|---------------------------|
//! | 0       | `params` uniform block    |
//! | 1..4    | `t0`..`t3` sampled inputs |
//! | 5       | linear clamp sampler      |

use crate::render::pass::PassKind;

pub const COMMON_PRELUDE: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    let x = f32((index << 1u) & 2u);
    let y = f32(index & 2u);
    var result: VsOut;
    result.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    result.uv = vec2<f32>(x, y);
    return result;
}

@group(0) @binding(1) var t0: texture_2d<f32>;
@group(0) @binding(2) var t1: texture_2d<f32>;
@group(0) @binding(3) var t2: texture_2d<f32>;
@group(0) @binding(4) var t3: texture_2d<f32>;
@group(0) @binding(5) var s_linear: sampler;

const PI: f32 = 3.14159265;
const LUMA: vec3<f32> = vec3<f32>(0.299, 0.587, 0.114);

fn rgb_to_yiq(c: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        dot(c, LUMA),
        dot(c, vec3<f32>(0.596, -0.274, -0.322)),
        dot(c, vec3<f32>(0.211, -0.523, 0.312)),
    );
}

fn yiq_to_rgb(c: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        dot(c, vec3<f32>(1.0, 0.956, 0.621)),
        dot(c, vec3<f32>(1.0, -0.272, -0.647)),
        dot(c, vec3<f32>(1.0, -1.106, 1.703)),
    );
}
"#;

pub const RESAMPLE_BILINEAR: &str = r#"
struct Params {
    src_offset: vec2<f32>,
    src_scale: vec2<f32>,
    src_size: vec2<f32>,
    dst_size: vec2<f32>,
    lod: f32,
    radius: f32,
    _padding: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let uv = params.src_offset + input.uv * params.src_scale;
    return textureSampleLevel(t0, s_linear, uv, params.lod);
}
"#;

pub const RESAMPLE_LANCZOS: &str = r#"
struct Params {
    src_offset: vec2<f32>,
    src_scale: vec2<f32>,
    src_size: vec2<f32>,
    dst_size: vec2<f32>,
    lod: f32,
    radius: f32,
    _padding: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

fn lanczos(x: f32, a: f32) -> f32 {
    let ax = abs(x);
    if (ax < 1e-5) {
        return 1.0;
    }
    if (ax >= a) {
        return 0.0;
    }
    let px = PI * x;
    return a * sin(px) * sin(px / a) / (px * px);
}

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let a = select(2.0, params.radius, params.radius > 0.0);
    let p = (params.src_offset + input.uv * params.src_scale) * params.src_size - 0.5;
    let stretch = clamp(
        params.src_scale * params.src_size / max(params.dst_size, vec2<f32>(1.0)),
        vec2<f32>(1.0),
        vec2<f32>(2.0),
    );
    let base = floor(p);
    let max_coord = vec2<i32>(textureDimensions(t0, 0)) - vec2<i32>(1);
    var sum = vec4<f32>(0.0);
    var wsum = 0.0;
    for (var j = -4; j <= 4; j++) {
        for (var i = -4; i <= 4; i++) {
            let tap = base + vec2<f32>(f32(i), f32(j));
            let d = (tap - p) / stretch;
            let w = lanczos(d.x, a) * lanczos(d.y, a);
            if (w != 0.0) {
                let coord = clamp(vec2<i32>(tap), vec2<i32>(0), max_coord);
                sum += textureLoad(t0, coord, 0) * w;
                wsum += w;
            }
        }
    }
    if (abs(wsum) < 1e-5) {
        return textureSampleLevel(t0, s_linear, (p + 0.5) / max(params.src_size, vec2<f32>(1.0)), 0.0);
    }
    return sum / wsum;
}
"#;

pub const BLUR: &str = r#"
struct Params {
    direction: vec2<f32>,
    texel: vec2<f32>,
    radius: f32,
    sigma: f32,
    kind: f32,
    _padding: f32,
}
@group(0) @binding(0) var<uniform> params: Params;

fn weight(k: f32) -> f32 {
    if (params.kind < 0.5) {
        return 1.0;
    }
    if (params.kind < 1.5) {
        return params.radius + 1.0 - abs(k);
    }
    let sigma = max(params.sigma, 1e-3);
    return exp(-(k * k) / (2.0 * sigma * sigma));
}

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let r = i32(max(params.radius, 0.0));
    var sum = vec4<f32>(0.0);
    var wsum = 0.0;
    for (var k = -r; k <= r; k++) {
        let fk = f32(k);
        let w = weight(fk);
        let uv = input.uv + params.direction * params.texel * fk;
        sum += textureSampleLevel(t0, s_linear, uv, 0.0) * w;
        wsum += w;
    }
    return sum / max(wsum, 1e-6);
}
"#;

pub const COLOR_SPLIT: &str = r#"
struct Params {
    luma_gain: f32,
    chroma_gain: f32,
    _padding: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let c = textureSampleLevel(t0, s_linear, input.uv, 0.0);
    let yiq = rgb_to_yiq(c.rgb);
    return vec4<f32>(yiq.x * params.luma_gain, yiq.yz * params.chroma_gain, 1.0);
}
"#;

pub const CHROMA: &str = r#"
struct Params {
    texel: vec2<f32>,
    chroma_lod: f32,
    taps: f32,
    dilation: f32,
    saturation: f32,
    _padding: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let y = textureSampleLevel(t0, s_linear, input.uv, 0.0).x;
    let taps = i32(max(params.taps, 0.0));
    let stride = params.texel.x * exp2(max(params.chroma_lod, 0.0));
    var avg = vec2<f32>(0.0);
    var best = vec2<f32>(0.0);
    var best_mag = -1.0;
    for (var k = -taps; k <= taps; k++) {
        let uv = vec2<f32>(input.uv.x + f32(k) * stride, input.uv.y);
        let iq = textureSampleLevel(t0, s_linear, uv, params.chroma_lod).yz;
        avg += iq;
        let mag = dot(iq, iq);
        if (mag > best_mag) {
            best_mag = mag;
            best = iq;
        }
    }
    avg /= f32(2 * taps + 1);
    let iq = mix(avg, best, params.dilation) * params.saturation;
    return vec4<f32>(max(yiq_to_rgb(vec3<f32>(y, iq)), vec3<f32>(0.0)), 1.0);
}
"#;

pub const DOTMASK_EXPAND: &str = r#"
struct Params {
    tile_size: vec2<f32>,
    cell_size: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let cell = floor(input.position.xy / max(params.cell_size, vec2<f32>(1e-3)));
    let tile = max(params.tile_size, vec2<f32>(1.0));
    let t = cell - tile * floor(cell / tile);
    return textureLoad(t0, vec2<i32>(t), 0);
}
"#;

pub const BLOOM_THRESHOLD: &str = r#"
struct Params {
    threshold: f32,
    lod: f32,
    _padding: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let c = textureSampleLevel(t0, s_linear, input.uv, params.lod).rgb;
    let knee = max(1.0 - params.threshold, 1e-3);
    let f = max(dot(c, LUMA) - params.threshold, 0.0) / knee;
    return vec4<f32>(c * f, 1.0);
}
"#;

pub const CRT_COMPOSITE: &str = r#"
struct Params {
    gamma_in: f32,
    gamma_out: f32,
    brightness_boost: f32,
    scanline_strength: f32,
    scanline_rows: f32,
    mask_strength: f32,
    mask_lod: f32,
    bloom_strength: f32,
    profile: array<vec4<f32>, 2>,
}
@group(0) @binding(0) var<uniform> params: Params;

fn profile_tap(i: u32) -> f32 {
    let j = min(i, 7u);
    return params.profile[j / 4u][j % 4u];
}

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let c = textureSampleLevel(t0, s_linear, input.uv, 0.0).rgb;
    let lin = pow(clamp(c, vec3<f32>(0.0), vec3<f32>(1.0)), vec3<f32>(params.gamma_in));

    let phase = fract(input.uv.y * params.scanline_rows);
    let pos = clamp(phase * 8.0 - 0.5, 0.0, 7.0);
    let i0 = u32(floor(pos));
    let profile = mix(profile_tap(i0), profile_tap(i0 + 1u), pos - f32(i0));
    let scan = mix(1.0, profile, params.scanline_strength);

    let m = textureSampleLevel(t1, s_linear, input.uv, params.mask_lod).rgb;
    let masked = mix(vec3<f32>(1.0), m, params.mask_strength);
    let bloom = textureSampleLevel(t2, s_linear, input.uv, 0.0).rgb;

    let v = (lin * scan * masked + bloom * params.bloom_strength) * params.brightness_boost;
    let color = pow(max(v, vec3<f32>(0.0)), vec3<f32>(1.0 / max(params.gamma_out, 1e-3)));
    return vec4<f32>(color, 1.0);
}
"#;

pub const DEBUG_SPLIT: &str = r#"
struct Params {
    mode: f32,
    split: f32,
    _padding: vec2<f32>,
}
@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let a = textureSampleLevel(t0, s_linear, vec2<f32>(input.uv.x * 2.0, input.uv.y), 0.0);
    let b = textureSampleLevel(t1, s_linear, vec2<f32>((input.uv.x - 0.5) * 2.0, input.uv.y), 0.0);
    if (params.mode >= 0.5) {
        return select(b, a, input.uv.x < 0.5);
    }
    let sa = textureSampleLevel(t0, s_linear, input.uv, 0.0);
    let sb = textureSampleLevel(t1, s_linear, input.uv, 0.0);
    return select(sb, sa, input.uv.x < params.split);
}
"#;

pub const MIP_DOWNSAMPLE: &str = r#"
@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    return textureSampleLevel(t0, s_linear, input.uv, 0.0);
}
"#;

/// Full WGSL module for one kernel.
pub fn kernel_source(kind: PassKind) -> String {
    let body = match kind {
        PassKind::ResampleBilinear => RESAMPLE_BILINEAR,
        PassKind::ResampleLanczos => RESAMPLE_LANCZOS,
        PassKind::Blur => BLUR,
        PassKind::ColorSplit => COLOR_SPLIT,
        PassKind::Chroma => CHROMA,
        PassKind::DotMaskExpand => DOTMASK_EXPAND,
        PassKind::BloomThreshold => BLOOM_THRESHOLD,
        PassKind::CrtComposite => CRT_COMPOSITE,
        PassKind::DebugSplit => DEBUG_SPLIT,
        PassKind::MipDownsample => MIP_DOWNSAMPLE,
    };
    format!("{}{}", COMMON_PRELUDE, body)
}

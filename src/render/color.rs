// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Color math shared by the CPU kernels and the dot-mask synthesizer.
//! The WGSL kernels carry the same constants.

/// Rec.601 luma weights
pub const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// HSB (hue in degrees, saturation and brightness in 0..1) to RGB.
#[inline(always)]
pub fn hsb_to_rgb(h: f32, s: f32, b: f32) -> [f32; 3] {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = b.clamp(0.0, 1.0);

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [r + m, g + m, b + m]
}

#[inline(always)]
pub fn luma(rgb: [f32; 3]) -> f32 {
    rgb[0] * LUMA[0] + rgb[1] * LUMA[1] + rgb[2] * LUMA[2]
}

/// RGB to YIQ, the NTSC composite signal space.
#[inline(always)]
pub fn rgb_to_yiq(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    [
        luma(rgb),
        0.596 * r - 0.274 * g - 0.322 * b,
        0.211 * r - 0.523 * g + 0.312 * b,
    ]
}

#[inline(always)]
pub fn yiq_to_rgb(yiq: [f32; 3]) -> [f32; 3] {
    let [y, i, q] = yiq;
    [
        y + 0.956 * i + 0.621 * q,
        y - 0.272 * i - 0.647 * q,
        y - 1.106 * i + 1.703 * q,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3], eps: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < eps)
    }

    #[test]
    fn test_hsb_primaries() {
        assert!(close(hsb_to_rgb(0.0, 1.0, 1.0), [1.0, 0.0, 0.0], 1e-6));
        assert!(close(hsb_to_rgb(120.0, 1.0, 1.0), [0.0, 1.0, 0.0], 1e-6));
        assert!(close(hsb_to_rgb(240.0, 1.0, 1.0), [0.0, 0.0, 1.0], 1e-6));
        assert!(close(hsb_to_rgb(300.0, 1.0, 1.0), [1.0, 0.0, 1.0], 1e-6));
        assert!(close(hsb_to_rgb(-60.0, 1.0, 1.0), [1.0, 0.0, 1.0], 1e-6));
    }

    #[test]
    fn test_hsb_desaturated_is_grey() {
        assert!(close(hsb_to_rgb(200.0, 0.0, 0.4), [0.4, 0.4, 0.4], 1e-6));
        let half = hsb_to_rgb(0.0, 0.5, 1.0);
        assert!(close(half, [1.0, 0.5, 0.5], 1e-6));
    }

    #[test]
    fn test_yiq_round_trip() {
        for rgb in [[1.0, 0.0, 0.0], [0.2, 0.7, 0.4], [0.5, 0.5, 0.5], [0.0, 0.0, 1.0]] {
            let back = yiq_to_rgb(rgb_to_yiq(rgb));
            assert!(close(rgb, back, 2e-3), "{:?} -> {:?}", rgb, back);
        }
        // grey carries no chroma
        let g = rgb_to_yiq([0.3, 0.3, 0.3]);
        assert!(g[1].abs() < 1e-6 && g[2].abs() < 1e-6);
    }
}

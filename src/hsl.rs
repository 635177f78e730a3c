//! RGB <-> HSL conversion
//!
//! Hue is in degrees `[0, 360)`, saturation and lightness are percentages
//! `[0, 100]`. Both directions are total: every 8-bit RGB triple has an HSL
//! representation and every HSL triple maps back to a valid RGB triple.

/// HSL color with hue in degrees and saturation/lightness as percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in degrees, `0.0..360.0`
    pub h: f64,
    /// Saturation, `0.0..=100.0`
    pub s: f64,
    /// Lightness, `0.0..=100.0`
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }

    /// Convert back to an RGB triple.
    pub fn to_rgb(self) -> [u8; 3] {
        hsl_to_rgb(self.h, self.s, self.l)
    }
}

/// Convert an 8-bit RGB triple to HSL.
///
/// Achromatic colors (`max == min`) have `h = 0` and `s = 0`.
///
/// # Examples
///
/// ```
/// use spritetint::hsl::rgb_to_hsl;
///
/// let blue = rgb_to_hsl(0x33, 0x66, 0xCC);
/// assert!((blue.h - 220.0).abs() < 1e-9);
/// assert!((blue.s - 60.0).abs() < 1e-9);
/// assert!((blue.l - 50.0).abs() < 1e-9);
/// ```
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return Hsl { h: 0.0, s: 0.0, l: l * 100.0 };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    let h = if max == r {
        let mut h = (g - b) / d;
        if g < b {
            h += 6.0;
        }
        h
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    let mut h = h * 60.0;
    if h >= 360.0 {
        h -= 360.0;
    }

    Hsl { h, s: s * 100.0, l: l * 100.0 }
}

/// Convert HSL to an 8-bit RGB triple.
///
/// Hue wraps modulo 360; saturation and lightness are clamped to `[0, 100]`.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let h = h.rem_euclid(360.0) / 360.0;
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);

    if s == 0.0 {
        let v = to_channel(l);
        return [v, v, v];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    [
        to_channel(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_channel(hue_to_channel(p, q, h)),
        to_channel(hue_to_channel(p, q, h - 1.0 / 3.0)),
    ]
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

//! Selective per-pixel recoloring
//!
//! Pixels whose HSL falls inside a family's [`ColorRange`] take the target
//! hue and saturation while keeping their own lightness, so the shading baked
//! into the sprite survives. Everything else, alpha included, is copied
//! through untouched.

use image::{GrayImage, Luma, RgbaImage};
use rayon::prelude::*;

use crate::hsl::{hsl_to_rgb, rgb_to_hsl};
use crate::range::ColorRange;

/// Recolor a single RGBA pixel.
///
/// Fully transparent pixels are never classified: their RGB is meaningless
/// padding and is returned as-is.
pub fn recolor_pixel(pixel: [u8; 4], range: &ColorRange, hue: f64, saturation: f64) -> [u8; 4] {
    let [r, g, b, a] = pixel;
    if a == 0 {
        return pixel;
    }

    let hsl = rgb_to_hsl(r, g, b);
    if !range.contains(hsl) {
        return pixel;
    }

    let [r, g, b] = hsl_to_rgb(hue, saturation, hsl.l);
    [r, g, b, a]
}

/// Recolor a raw RGBA buffer of `width * height` pixels.
///
/// Rows are processed in parallel; the returned buffer is complete before
/// anything else can see it.
///
/// # Panics
///
/// Panics if `pixels.len() != width * height * 4`.
pub fn recolor_pixels(
    pixels: &[u8],
    width: u32,
    height: u32,
    range: &ColorRange,
    hue: f64,
    saturation: f64,
) -> Vec<u8> {
    let row_len = width as usize * 4;
    assert_eq!(
        pixels.len(),
        row_len * height as usize,
        "RGBA buffer length does not match {}x{}",
        width,
        height
    );

    let mut output = pixels.to_vec();
    if output.is_empty() {
        return output;
    }

    output.par_chunks_mut(row_len).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let recolored = recolor_pixel([px[0], px[1], px[2], px[3]], range, hue, saturation);
            px.copy_from_slice(&recolored);
        }
    });

    output
}

/// Recolor an image, returning a new image of the same dimensions.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use spritetint::families::get_builtin;
/// use spritetint::recolor::recolor_image;
///
/// let blue = get_builtin("blue").unwrap();
/// let mut sprite = RgbaImage::from_pixel(2, 1, Rgba([0x33, 0x66, 0xCC, 255]));
/// sprite.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
///
/// let red = recolor_image(&sprite, blue.range(), 0.0, 60.0);
/// assert_eq!(red.get_pixel(0, 0), &Rgba([0xCC, 0x33, 0x33, 255]));
/// assert_eq!(red.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
/// ```
pub fn recolor_image(image: &RgbaImage, range: &ColorRange, hue: f64, saturation: f64) -> RgbaImage {
    let (width, height) = image.dimensions();
    let pixels = recolor_pixels(image.as_raw(), width, height, range, hue, saturation);
    RgbaImage::from_raw(width, height, pixels)
        .unwrap_or_else(|| unreachable!("recolor_pixels preserves buffer length"))
}

/// How much of an image a family's range claims.
#[derive(Debug, Clone)]
pub struct Coverage {
    /// Pixels classified as team color
    pub matched: usize,
    /// Pixels with non-zero alpha
    pub opaque: usize,
    /// White where matched, black elsewhere
    pub mask: GrayImage,
}

impl Coverage {
    /// Fraction of visible pixels that would be recolored.
    pub fn ratio(&self) -> f64 {
        if self.opaque == 0 {
            0.0
        } else {
            self.matched as f64 / self.opaque as f64
        }
    }
}

/// Classify every pixel of `image` against `range` without recoloring.
pub fn classify_image(image: &RgbaImage, range: &ColorRange) -> Coverage {
    let mut mask = GrayImage::new(image.width(), image.height());
    let mut matched = 0;
    let mut opaque = 0;

    for (x, y, px) in image.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        opaque += 1;
        if range.contains(rgb_to_hsl(r, g, b)) {
            matched += 1;
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    Coverage { matched, opaque, mask }
}

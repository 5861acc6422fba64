use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use tracing::debug;

use super::types::BinaryMask;

/// Parameters controlling mask generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    /// Explicit threshold; `None` selects Otsu
    pub threshold: Option<u8>,

    /// Factor applied to the Otsu level
    pub otsu_multiplier: f64,

    /// Gaussian sigma; 0 disables the blur
    pub blur_sigma: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            threshold: None,
            otsu_multiplier: 1.05,
            blur_sigma: 1.0,
        }
    }
}

/// A generated mask and the threshold that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMask {
    pub threshold: u8,
    pub mask: BinaryMask,
}

/// Derive a tissue mask from a pixel buffer.
///
/// Pixels darker than the effective threshold (after blurring) are tissue.
/// A constant-intensity input with no explicit threshold yields an
/// all-background mask and a threshold equal to that intensity.
pub fn generate(pixels: &RgbImage, params: &ThresholdParams) -> GeneratedMask {
    let (width, height) = pixels.dimensions();
    let gray = luminance(pixels);

    if params.threshold.is_none() {
        if let Some(value) = uniform_value(&gray) {
            debug!(value, "Uniform input, mask is all background");
            return GeneratedMask {
                threshold: value,
                mask: BinaryMask::new_background(width, height),
            };
        }
    }

    let blurred = if params.blur_sigma > 0.0 {
        gaussian_blur_f32(&gray, params.blur_sigma as f32)
    } else {
        gray
    };

    let threshold = match params.threshold {
        Some(t) => t,
        None => {
            // First intensity of the bright class, so `<` keeps Otsu's split
            let otsu = otsu_level(&blurred).saturating_add(1);
            let scaled = (otsu as f64 * params.otsu_multiplier).round().clamp(0.0, 255.0) as u8;
            debug!(otsu, threshold = scaled, "Computed automatic threshold");
            scaled
        }
    };

    let mask = BinaryMask::from_fn(width, height, |x, y| blurred.get_pixel(x, y)[0] < threshold);
    GeneratedMask { threshold, mask }
}

/// Rec. 601 luma, rounded to the nearest integer.
fn luminance(pixels: &RgbImage) -> GrayImage {
    GrayImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b] = pixels.get_pixel(x, y).0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        Luma([luma as u8])
    })
}

fn uniform_value(gray: &GrayImage) -> Option<u8> {
    let raw = gray.as_raw();
    let first = *raw.first()?;
    raw.iter().all(|&v| v == first).then_some(first)
}

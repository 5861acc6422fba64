use image::RgbImage;
use rayon::prelude::*;

use crate::error::MaskError;

use super::types::{BinaryMask, TISSUE};

/// Colour written over background pixels.
pub const BACKGROUND_PIXEL: [u8; 3] = [255, 255, 255];

/// A level's pixels with background suppressed.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedLevel {
    pub image: RgbImage,

    /// Share of tissue cells, in `[0, 100]`
    pub tissue_percentage: f64,
}

/// Composite a mask onto a pixel buffer of the same shape.
///
/// Tissue pixels pass through, background pixels become white. The input
/// buffer is left untouched.
pub fn apply(pixels: &RgbImage, mask: &BinaryMask) -> Result<MaskedLevel, MaskError> {
    let (width, height) = pixels.dimensions();
    if mask.dimensions() != (width, height) {
        return Err(MaskError::ShapeMismatch {
            mask_width: mask.width(),
            mask_height: mask.height(),
            image_width: width,
            image_height: height,
        });
    }

    let mut image = pixels.clone();
    if width == 0 || height == 0 {
        return Ok(MaskedLevel {
            image,
            tissue_percentage: 0.0,
        });
    }

    let row_len = width as usize;
    let tissue: u64 = image
        .par_chunks_mut(row_len * 3)
        .zip(mask.as_raw().par_chunks(row_len))
        .map(|(row, cells)| {
            let mut count = 0u64;
            for (px, &cell) in row.chunks_exact_mut(3).zip(cells) {
                if cell == TISSUE {
                    count += 1;
                } else {
                    px.copy_from_slice(&BACKGROUND_PIXEL);
                }
            }
            count
        })
        .sum();

    Ok(MaskedLevel {
        image,
        tissue_percentage: tissue as f64 / mask.area() as f64 * 100.0,
    })
}

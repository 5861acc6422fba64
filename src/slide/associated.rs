//! Pixel reads for associated images.
//!
//! Label, macro and thumbnail images are usually stored as strips with LZW
//! or JPEG compression, which the tile reader does not handle. They are small,
//! so the `tiff` decoder reads them whole from the slide file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use crate::error::SlideError;
use crate::format::tiff::AssociatedImage;

/// Decode one associated image of the slide at `path` to RGB.
pub fn read_associated(path: &Path, image: &AssociatedImage) -> Result<RgbImage, SlideError> {
    let fail = |message: String| SlideError::AssociatedDecode {
        name: image.name.clone(),
        message,
    };

    let file = File::open(path).map_err(|e| fail(format!("{}: {}", path.display(), e)))?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| fail(e.to_string()))?;
    decoder
        .seek_to_image(image.ifd_index)
        .map_err(|e| fail(e.to_string()))?;

    let (width, height) = decoder.dimensions().map_err(|e| fail(e.to_string()))?;
    let color = decoder.colortype().map_err(|e| fail(e.to_string()))?;
    let DecodingResult::U8(data) = decoder.read_image().map_err(|e| fail(e.to_string()))? else {
        return Err(fail(format!("unsupported sample format {:?}", color)));
    };

    let decoded = match color {
        ColorType::RGB(8) => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        ColorType::RGBA(8) => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        ColorType::Gray(8) => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        other => return Err(fail(format!("unsupported colour type {:?}", other))),
    };

    decoded
        .map(|img| img.to_rgb8())
        .ok_or_else(|| fail("decoded buffer does not match image dimensions".to_string()))
}

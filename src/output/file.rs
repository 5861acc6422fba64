use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use image::{ImageFormat, RgbImage};
use tiff::encoder::compression::{Deflate, Lzw, Uncompressed};
use tiff::encoder::{colortype, TiffEncoder, TiffKind};
use tracing::{debug, info};

use crate::error::OutputError;
use crate::mask::BinaryMask;
use crate::pipeline::{OutputCompression, RunRecord};

use super::emitter::Emitter;
use super::layout::has_tiff_extension;

/// Raw pixel bytes above which output switches to BigTIFF.
///
/// Classic TIFF offsets are 32-bit; compressed output is usually smaller
/// than the raw size, so this leaves headroom below 4 GiB.
const BIGTIFF_THRESHOLD_BYTES: u64 = 3 * 1024 * 1024 * 1024;

/// Emitter writing TIFF, PNG and JSON files to the local filesystem.
#[derive(Debug, Clone, Copy)]
pub struct FileEmitter {
    multi_page: bool,
}

impl Default for FileEmitter {
    fn default() -> Self {
        Self { multi_page: true }
    }
}

impl FileEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emitter restricted to single-page files.
    pub fn single_page() -> Self {
        Self { multi_page: false }
    }

    fn create(path: &Path) -> Result<BufWriter<File>, OutputError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| OutputError::io(path, e))?;
        Ok(BufWriter::new(file))
    }

    fn write_tiff(
        path: &Path,
        pages: &[&RgbImage],
        compression: OutputCompression,
    ) -> Result<(), OutputError> {
        let raw_bytes: u64 = pages.iter().map(|p| p.as_raw().len() as u64).sum();
        let mut writer = Self::create(path)?;

        if raw_bytes > BIGTIFF_THRESHOLD_BYTES {
            debug!(path = %path.display(), raw_bytes, "Writing BigTIFF");
            let mut encoder =
                TiffEncoder::new_big(&mut writer).map_err(|e| OutputError::encode(path, e))?;
            write_pages(&mut encoder, pages, compression).map_err(|e| OutputError::encode(path, e))?;
        } else {
            let mut encoder =
                TiffEncoder::new(&mut writer).map_err(|e| OutputError::encode(path, e))?;
            write_pages(&mut encoder, pages, compression).map_err(|e| OutputError::encode(path, e))?;
        }

        writer.flush().map_err(|e| OutputError::io(path, e))
    }
}

fn write_pages<W: Write + Seek, K: TiffKind>(
    encoder: &mut TiffEncoder<W, K>,
    pages: &[&RgbImage],
    compression: OutputCompression,
) -> tiff::TiffResult<()> {
    for page in pages {
        let (width, height) = page.dimensions();
        let data = page.as_raw().as_slice();
        match compression {
            OutputCompression::None => encoder
                .write_image_with_compression::<colortype::RGB8, _>(width, height, Uncompressed, data)?,
            OutputCompression::Lzw => encoder
                .write_image_with_compression::<colortype::RGB8, _>(width, height, Lzw, data)?,
            OutputCompression::Deflate => encoder.write_image_with_compression::<colortype::RGB8, _>(
                width,
                height,
                Deflate::default(),
                data,
            )?,
        }
    }
    Ok(())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}

impl Emitter for FileEmitter {
    fn supports_pyramid(&self) -> bool {
        self.multi_page
    }

    fn write_level(
        &self,
        path: &Path,
        image: &RgbImage,
        compression: OutputCompression,
    ) -> Result<(), OutputError> {
        if is_png(path) {
            let mut writer = Self::create(path)?;
            image
                .write_to(&mut writer, ImageFormat::Png)
                .map_err(|e| OutputError::encode(path, e))?;
            writer.flush().map_err(|e| OutputError::io(path, e))?;
        } else if has_tiff_extension(path) {
            Self::write_tiff(path, &[image], compression)?;
        } else {
            return Err(OutputError::UnsupportedExtension(path.to_path_buf()));
        }

        info!(path = %path.display(), width = image.width(), height = image.height(), "Wrote level");
        Ok(())
    }

    fn write_pyramid(
        &self,
        path: &Path,
        pages: &[&RgbImage],
        compression: OutputCompression,
    ) -> Result<(), OutputError> {
        if !has_tiff_extension(path) {
            return Err(OutputError::UnsupportedExtension(path.to_path_buf()));
        }
        Self::write_tiff(path, pages, compression)?;

        info!(path = %path.display(), pages = pages.len(), "Wrote pyramid");
        Ok(())
    }

    fn write_mask(&self, path: &Path, mask: &BinaryMask) -> Result<(), OutputError> {
        let mut writer = Self::create(path)?;
        mask.to_png_image()
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| OutputError::encode(path, e))?;
        writer.flush().map_err(|e| OutputError::io(path, e))?;

        info!(path = %path.display(), "Wrote mask");
        Ok(())
    }

    fn write_metadata(&self, path: &Path, record: &RunRecord) -> Result<(), OutputError> {
        let json = record.to_json().map_err(|e| OutputError::encode(path, e))?;
        let mut writer = Self::create(path)?;
        writer
            .write_all(json.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| OutputError::io(path, e))?;

        info!(path = %path.display(), "Wrote metadata");
        Ok(())
    }
}

use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::error::OutputError;
use crate::mask::BinaryMask;
use crate::pipeline::{OutputCompression, RunRecord};

/// Sink for everything a run persists.
///
/// The pipeline computes results first and hands them to an emitter; a
/// dry run swaps in [`DryRunEmitter`] and touches nothing on disk.
pub trait Emitter: Send + Sync {
    /// Whether [`Emitter::write_pyramid`] can store several pages in one file.
    fn supports_pyramid(&self) -> bool;

    /// Write one level as a single-page image.
    fn write_level(
        &self,
        path: &Path,
        image: &RgbImage,
        compression: OutputCompression,
    ) -> Result<(), OutputError>;

    /// Write several levels as pages of one TIFF, in the given order.
    fn write_pyramid(
        &self,
        path: &Path,
        pages: &[&RgbImage],
        compression: OutputCompression,
    ) -> Result<(), OutputError>;

    /// Write the mask as a black-on-white PNG.
    fn write_mask(&self, path: &Path, mask: &BinaryMask) -> Result<(), OutputError>;

    /// Write the run record as pretty-printed JSON.
    fn write_metadata(&self, path: &Path, record: &RunRecord) -> Result<(), OutputError>;
}

/// Emitter that only logs what would be written.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunEmitter;

impl Emitter for DryRunEmitter {
    fn supports_pyramid(&self) -> bool {
        true
    }

    fn write_level(
        &self,
        path: &Path,
        image: &RgbImage,
        compression: OutputCompression,
    ) -> Result<(), OutputError> {
        info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            compression = compression.as_str(),
            "Dry run: would write level"
        );
        Ok(())
    }

    fn write_pyramid(
        &self,
        path: &Path,
        pages: &[&RgbImage],
        compression: OutputCompression,
    ) -> Result<(), OutputError> {
        info!(
            path = %path.display(),
            pages = pages.len(),
            compression = compression.as_str(),
            "Dry run: would write pyramid"
        );
        Ok(())
    }

    fn write_mask(&self, path: &Path, mask: &BinaryMask) -> Result<(), OutputError> {
        info!(
            path = %path.display(),
            width = mask.width(),
            height = mask.height(),
            "Dry run: would write mask"
        );
        Ok(())
    }

    fn write_metadata(&self, path: &Path, record: &RunRecord) -> Result<(), OutputError> {
        info!(
            path = %path.display(),
            levels = record.levels.len(),
            "Dry run: would write metadata"
        );
        Ok(())
    }
}

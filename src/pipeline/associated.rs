use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::format::tiff::AssociatedImage;
use crate::output::{associated_image_path, Emitter};
use crate::slide::read_associated;

use super::params::OutputCompression;

/// Outcome of exporting a slide's associated images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociatedExport {
    pub written: Vec<PathBuf>,

    /// `(image name, error)` per image that could not be exported
    pub failed: Vec<(String, String)>,
}

impl AssociatedExport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write every associated image of the slide at `slide_path` as a PNG in
/// `out_dir`. A failing image is recorded and the rest are still written.
pub fn export_associated<E: Emitter + ?Sized>(
    slide_path: &Path,
    images: &[AssociatedImage],
    out_dir: &Path,
    emitter: &E,
) -> AssociatedExport {
    let mut report = AssociatedExport::default();

    for image in images {
        let path = associated_image_path(out_dir, slide_path, &image.name);
        let result = read_associated(slide_path, image)
            .map_err(|e| e.to_string())
            .and_then(|pixels| {
                emitter
                    .write_level(&path, &pixels, OutputCompression::None)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(()) => {
                info!(name = %image.name, path = %path.display(), "Exported associated image");
                report.written.push(path);
            }
            Err(message) => {
                warn!(name = %image.name, error = %message, "Skipping associated image");
                report.failed.push((image.name.clone(), message));
            }
        }
    }

    report
}

use std::path::{Path, PathBuf};

use crate::pipeline::OutputMode;

/// Where a run's files go, derived from the user's output path.
///
/// | File            | Path                          |
/// |-----------------|-------------------------------|
/// | level 0         | `<output>`                    |
/// | level N         | `<dir>/<stem>_levelN.<ext>`   |
/// | mask            | `<dir>/<stem>_mask.png`       |
/// | metadata        | `<dir>/<stem>_metadata.json`  |
///
/// In pyramid mode the output gets a `.tiff` extension unless it already
/// has `.tif` or `.tiff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    output: PathBuf,
}

impl OutputLayout {
    pub fn new(output: impl Into<PathBuf>, mode: OutputMode) -> Self {
        let mut output = output.into();
        if mode == OutputMode::SinglePyramid && !has_tiff_extension(&output) {
            output.set_extension("tiff");
        }
        Self { output }
    }

    /// The main output file.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// File for one level in per-level mode.
    pub fn level_path(&self, level: usize) -> PathBuf {
        if level == 0 {
            return self.output.clone();
        }
        let name = match self.output.extension() {
            Some(ext) => format!("{}_level{}.{}", self.stem(), level, ext.to_string_lossy()),
            None => format!("{}_level{}", self.stem(), level),
        };
        self.output.with_file_name(name)
    }

    pub fn mask_path(&self) -> PathBuf {
        self.output.with_file_name(format!("{}_mask.png", self.stem()))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output
            .with_file_name(format!("{}_metadata.json", self.stem()))
    }

    fn stem(&self) -> String {
        self.output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// PNG path for an associated image: `<dir>/<stem>_associated_<name>.png`.
///
/// Characters other than ASCII alphanumerics, `_` and `-` in `name` become `_`.
pub fn associated_image_path(dir: &Path, slide: &Path, name: &str) -> PathBuf {
    let stem = slide
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    dir.join(format!("{}_associated_{}.png", stem, safe))
}

pub(crate) fn has_tiff_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_associated_image_path() {
        let path = associated_image_path(Path::new("/export"), Path::new("/in/case 7.svs"), "label");
        assert_eq!(path, PathBuf::from("/export/case 7_associated_label.png"));

        let path = associated_image_path(Path::new("/export"), Path::new("/in/case.svs"), "a b/c");
        assert_eq!(path, PathBuf::from("/export/case_associated_a_b_c.png"));
    }

    #[test]
    fn test_per_level_paths() {
        let layout = OutputLayout::new("/out/case.tiff", OutputMode::PerLevelFiles);

        assert_eq!(layout.level_path(0), PathBuf::from("/out/case.tiff"));
        assert_eq!(layout.level_path(2), PathBuf::from("/out/case_level2.tiff"));
        assert_eq!(layout.mask_path(), PathBuf::from("/out/case_mask.png"));
        assert_eq!(layout.metadata_path(), PathBuf::from("/out/case_metadata.json"));
    }

    #[test]
    fn test_per_level_keeps_png_extension() {
        let layout = OutputLayout::new("out/case.png", OutputMode::PerLevelFiles);
        assert_eq!(layout.level_path(1), PathBuf::from("out/case_level1.png"));
    }

    #[test]
    fn test_pyramid_forces_tiff_extension() {
        let layout = OutputLayout::new("/out/case.png", OutputMode::SinglePyramid);
        assert_eq!(layout.output_path(), Path::new("/out/case.tiff"));

        let layout = OutputLayout::new("/out/case.TIF", OutputMode::SinglePyramid);
        assert_eq!(layout.output_path(), Path::new("/out/case.TIF"));

        let layout = OutputLayout::new("/out/case", OutputMode::SinglePyramid);
        assert_eq!(layout.output_path(), Path::new("/out/case.tiff"));
    }
}

//! Batch processing of a directory of slides.
//!
//! Settings come from a JSON file:
//!
//! ```json
//! {
//!   "input_dir": "/data/slides",
//!   "output_dir": "/data/masked",
//!   "output_format": "tiff",
//!   "multiplier": 1.05,
//!   "clean_mask": true,
//!   "levels": [0, 2]
//! }
//! ```
//!
//! `levels` may also be a comma-separated string such as `"0,2"`.
//!
//! Only `input_dir` and `output_dir` are required; every other key falls back
//! to the same default as the `mask` command.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{error, info, warn};

use crate::error::ConfigError;
use crate::pipeline::{
    LevelSelection, OutputCompression, OutputMode, ProcessingParams, RunRequest, SlideJob,
};

/// Extension of slides picked up by [`discover_slides`].
pub const SLIDE_EXTENSION: &str = "svs";

const OUTPUT_FORMATS: &[&str] = &["tiff", "tif", "png"];

fn default_output_format() -> String {
    "tiff".to_string()
}

fn default_multiplier() -> f64 {
    ProcessingParams::default().otsu_multiplier
}

fn default_sigma() -> f64 {
    ProcessingParams::default().blur_sigma
}

fn default_min_area() -> u32 {
    ProcessingParams::default().min_area_pixels
}

/// Level list as a JSON array or as the CLI's comma-separated form.
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelList {
    List(Vec<usize>),
    Csv(String),
}

fn deserialize_levels<'de, D>(deserializer: D) -> Result<Option<Vec<usize>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LevelList>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LevelList::List(levels)) => Ok(Some(levels)),
        Some(LevelList::Csv(text)) => match LevelSelection::parse_list(&text) {
            Ok(LevelSelection::Explicit(levels)) => Ok(Some(levels)),
            Ok(_) => Ok(None),
            Err(e) => Err(serde::de::Error::custom(e)),
        },
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Contents of a batch configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Extension of the per-slide output files
    #[serde(default = "default_output_format")]
    pub output_format: String,

    #[serde(default)]
    pub threshold: Option<u8>,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_sigma")]
    pub sigma: f64,

    #[serde(default)]
    pub clean_mask: bool,

    #[serde(default = "default_min_area")]
    pub min_area: u32,

    #[serde(default)]
    pub save_mask: bool,

    #[serde(default)]
    pub pyramid: bool,

    #[serde(default)]
    pub compression: OutputCompression,

    #[serde(default)]
    pub max_level: Option<usize>,

    /// Takes precedence over `max_level`
    #[serde(default, deserialize_with = "deserialize_levels")]
    pub levels: Option<Vec<usize>>,

    #[serde(default)]
    pub mask_level: Option<usize>,
}

impl BatchSettings {
    /// Read and parse a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::Batch(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Batch(e.to_string()))
    }

    /// Processing parameters shared by every slide.
    pub fn params(&self) -> Result<ProcessingParams, ConfigError> {
        let format = self.output_format.to_ascii_lowercase();
        if !OUTPUT_FORMATS.contains(&format.as_str()) {
            return Err(ConfigError::InvalidParameter {
                name: "output_format",
                message: format!("expected one of {:?}, got '{}'", OUTPUT_FORMATS, self.output_format),
            });
        }

        ProcessingParams {
            threshold: self.threshold,
            otsu_multiplier: self.multiplier,
            blur_sigma: self.sigma,
            clean_mask: self.clean_mask,
            min_area_pixels: self.min_area,
            compression: self.compression,
            output_mode: if self.pyramid {
                OutputMode::SinglePyramid
            } else {
                OutputMode::PerLevelFiles
            },
        }
        .validate()
    }

    pub fn level_selection(&self) -> LevelSelection {
        match (&self.levels, self.max_level) {
            (Some(levels), _) => LevelSelection::Explicit(levels.clone()),
            (None, Some(max)) => LevelSelection::UpTo(max),
            (None, None) => LevelSelection::All,
        }
    }

    /// Output path for one slide: `<output_dir>/<stem>.<output_format>`.
    pub fn output_path(&self, slide: &Path) -> PathBuf {
        let stem = slide
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir
            .join(format!("{}.{}", stem, self.output_format.to_ascii_lowercase()))
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// List `*.svs` files directly inside `dir`, sorted by path.
pub fn discover_slides(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| ConfigError::Batch(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut slides: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|e| e.eq_ignore_ascii_case(SLIDE_EXTENSION))
                .unwrap_or(false)
        })
        .collect();
    slides.sort();
    Ok(slides)
}

/// Create the output directory, refusing to reuse a non-empty one unless
/// `force` is set.
pub fn prepare_output_dir(dir: &Path, force: bool) -> Result<(), ConfigError> {
    if dir.is_dir() {
        let non_empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        if non_empty {
            if !force {
                return Err(ConfigError::Batch(format!(
                    "output directory {} is not empty (use --force to overwrite)",
                    dir.display()
                )));
            }
            warn!(dir = %dir.display(), "Output directory is not empty, existing files may be overwritten");
        }
        return Ok(());
    }

    fs::create_dir_all(dir)
        .map_err(|e| ConfigError::Batch(format!("cannot create {}: {}", dir.display(), e)))
}

// =============================================================================
// Runner
// =============================================================================

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Process every slide under `input_dir`, continuing past failures.
pub async fn run_batch(
    settings: &BatchSettings,
    force: bool,
    dry_run: bool,
) -> Result<BatchReport, ConfigError> {
    let params = settings.params()?;
    let levels = settings.level_selection();

    if !settings.input_dir.is_dir() {
        return Err(ConfigError::InputNotFound(settings.input_dir.clone()));
    }
    let slides = discover_slides(&settings.input_dir)?;
    if slides.is_empty() {
        warn!(dir = %settings.input_dir.display(), "No slides found");
        return Ok(BatchReport::default());
    }

    if !dry_run {
        prepare_output_dir(&settings.output_dir, force)?;
    }

    info!(count = slides.len(), "Starting batch");

    let mut report = BatchReport::default();
    for (i, slide) in slides.iter().enumerate() {
        info!(
            slide = %slide.display(),
            "Processing slide {}/{}",
            i + 1,
            slides.len()
        );

        let job = SlideJob {
            input: slide.clone(),
            output: settings.output_path(slide),
            params: params.clone(),
            request: RunRequest {
                levels: levels.clone(),
                mask_level: settings.mask_level,
                save_mask: settings.save_mask,
            },
            dry_run,
        };

        match job.run().await {
            Ok(summary) if summary.is_success() => report.succeeded.push(slide.clone()),
            Ok(summary) => {
                let levels: Vec<String> = summary
                    .failed_levels
                    .iter()
                    .map(|(level, message)| format!("level {}: {}", level, message))
                    .collect();
                let message = levels.join("; ");
                error!(slide = %slide.display(), error = %message, "Slide finished with failed levels");
                report.failed.push((slide.clone(), message));
            }
            Err(e) => {
                error!(slide = %slide.display(), error = %e, "Slide failed");
                report.failed.push((slide.clone(), e.to_string()));
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Batch complete"
    );
    Ok(report)
}

//! Command-line configuration.
//!
//! Three subcommands:
//!
//! - `mask`: mask one slide
//! - `batch`: mask every `.svs` slide in a directory, settings from a JSON file
//! - `inspect`: print a slide's identity and level catalog, optionally
//!   exporting its thumbnail, label and macro images
//!
//! # Environment Variables
//!
//! Options of the `mask` command can also be set with the `WSI_MASK_` prefix:
//!
//! - `WSI_MASK_INPUT` / `WSI_MASK_OUTPUT` - Slide and output paths
//! - `WSI_MASK_THRESHOLD` - Fixed threshold (default: Otsu)
//! - `WSI_MASK_MULTIPLIER` - Otsu multiplier (default: 1.05)
//! - `WSI_MASK_SIGMA` - Blur sigma (default: 1.0)
//! - `WSI_MASK_MIN_AREA` - Cleaning area in pixels (default: 10)
//! - `WSI_MASK_COMPRESSION` - none, lzw or zlib (default: lzw)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::ConfigError;
use crate::pipeline::{
    LevelSelection, OutputCompression, OutputMode, ProcessingParams, RunRequest, SlideJob,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default Otsu threshold multiplier.
pub const DEFAULT_MULTIPLIER: f64 = 1.05;

/// Default Gaussian blur sigma.
pub const DEFAULT_SIGMA: f64 = 1.0;

/// Default minimum component area for mask cleaning.
pub const DEFAULT_MIN_AREA: u32 = 10;

/// Default batch configuration file.
pub const DEFAULT_BATCH_CONFIG: &str = "config.json";

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Tissue Mask - background removal for Whole Slide Images.
///
/// Computes a tissue mask once at a coarse pyramid level and applies it to
/// every requested level.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-tissue-mask")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Mask one slide
    Mask(MaskConfig),

    /// Mask every slide in a directory
    Batch(BatchConfig),

    /// Print a slide's level catalog
    Inspect(InspectConfig),
}

// =============================================================================
// Mask Command
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq)]
pub struct MaskConfig {
    /// Input slide (.svs or pyramidal .tif/.tiff).
    #[arg(short, long, env = "WSI_MASK_INPUT")]
    pub input: PathBuf,

    /// Output path for level 0 (.tif, .tiff or .png).
    ///
    /// Other levels are written next to it as `<stem>_levelN.<ext>`.
    #[arg(short, long, env = "WSI_MASK_OUTPUT")]
    pub output: PathBuf,

    /// Fixed threshold (0-255). Uses Otsu's method when omitted.
    #[arg(short, long, env = "WSI_MASK_THRESHOLD")]
    pub threshold: Option<u8>,

    /// Multiplier applied to the Otsu threshold.
    #[arg(short, long, default_value_t = DEFAULT_MULTIPLIER, env = "WSI_MASK_MULTIPLIER")]
    pub multiplier: f64,

    /// Gaussian blur sigma before thresholding; 0 disables blurring.
    #[arg(short, long, default_value_t = DEFAULT_SIGMA, env = "WSI_MASK_SIGMA")]
    pub sigma: f64,

    /// Remove small tissue specks and fill small holes.
    #[arg(long, default_value_t = false)]
    pub clean_mask: bool,

    /// Area threshold in pixels used by --clean-mask.
    #[arg(long, default_value_t = DEFAULT_MIN_AREA, env = "WSI_MASK_MIN_AREA")]
    pub min_area: u32,

    /// Also write the mask as `<stem>_mask.png`.
    #[arg(long, default_value_t = false)]
    pub save_mask: bool,

    /// Write all levels into one multi-page pyramid TIFF.
    #[arg(long, default_value_t = false)]
    pub pyramid: bool,

    /// TIFF compression.
    #[arg(long, value_enum, default_value_t = OutputCompression::Lzw, env = "WSI_MASK_COMPRESSION")]
    pub compression: OutputCompression,

    /// Process levels 0 through N.
    #[arg(long)]
    pub max_level: Option<usize>,

    /// Comma-separated levels to process, in order (overrides --max-level).
    #[arg(long)]
    pub levels: Option<String>,

    /// Level the mask is computed on (default: finest level within 4096 px).
    #[arg(long)]
    pub mask_level: Option<usize>,

    /// Compute everything but write no files.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl MaskConfig {
    /// Validate the arguments and build the job they describe.
    pub fn validate(&self) -> Result<SlideJob, ConfigError> {
        if !self.input.is_file() {
            return Err(ConfigError::InputNotFound(self.input.clone()));
        }

        Ok(SlideJob {
            input: self.input.clone(),
            output: self.output.clone(),
            params: self.params()?,
            request: RunRequest {
                levels: self.level_selection()?,
                mask_level: self.mask_level,
                save_mask: self.save_mask,
            },
            dry_run: self.dry_run,
        })
    }

    pub fn params(&self) -> Result<ProcessingParams, ConfigError> {
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

    pub fn level_selection(&self) -> Result<LevelSelection, ConfigError> {
        match (&self.levels, self.max_level) {
            (Some(list), _) => LevelSelection::parse_list(list),
            (None, Some(max)) => Ok(LevelSelection::UpTo(max)),
            (None, None) => Ok(LevelSelection::All),
        }
    }
}

// =============================================================================
// Batch Command
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// JSON settings file.
    #[arg(short, long, default_value = DEFAULT_BATCH_CONFIG, env = "WSI_MASK_BATCH_CONFIG")]
    pub config: PathBuf,

    /// Write into a non-empty output directory.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Compute everything but write no files.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Inspect Command
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq)]
pub struct InspectConfig {
    /// Slide to inspect.
    #[arg(short, long, env = "WSI_MASK_INPUT")]
    pub input: PathBuf,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Write the associated images (thumbnail, label, macro) as PNG files
    /// into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_associated: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================

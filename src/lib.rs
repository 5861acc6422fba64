//! # WSI Tissue Mask
//!
//! Background removal for Whole Slide Images (WSI).
//!
//! A tissue mask is computed once at a coarse pyramid level, then rescaled
//! and applied to every requested resolution level so all levels agree on
//! which regions are tissue. Background pixels become white.
//!
//! ## Features
//!
//! - **Native pyramid reader**: Aperio SVS and pyramidal TIFF/BigTIFF, JPEG or uncompressed tiles
//! - **Otsu or fixed thresholding** with Gaussian pre-blur
//! - **Mask cleaning**: removes small tissue specks and fills small holes
//! - **Lossless output**: per-level TIFF/PNG files or one multi-page pyramid TIFF
//! - **Run metadata**: JSON record of the slide, parameters and per-level tissue coverage
//! - **Associated images**: thumbnail, label and macro export as PNG
//!
//! ## Architecture
//!
//! - [`io`] - Async range reads over local files
//! - [`mod@format`] - TIFF/SVS parsing and JPEG tile handling
//! - [`slide`] - Level catalog and full-level pixel reads
//! - [`mask`] - Generate, clean, scale and apply masks
//! - [`output`] - Output naming and file writers
//! - [`pipeline`] - Parameters, level processing and run records
//! - [`batch`] - Directory runs driven by a JSON settings file
//! - [`config`] - CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_tissue_mask::{LevelSelection, ProcessingParams, RunRequest, SlideJob};
//!
//! #[tokio::main]
//! async fn main() {
//!     let job = SlideJob {
//!         input: "slide.svs".into(),
//!         output: "masked/slide.tiff".into(),
//!         params: ProcessingParams::default(),
//!         request: RunRequest {
//!             levels: LevelSelection::UpTo(2),
//!             mask_level: None,
//!             save_mask: true,
//!         },
//!         dry_run: false,
//!     };
//!
//!     let summary = job.run().await.unwrap();
//!     println!("{}", summary.record.to_json().unwrap());
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod slide;

// Re-export commonly used types
pub use batch::{run_batch, BatchReport, BatchSettings};
pub use config::{BatchConfig, Cli, Command, InspectConfig, MaskConfig};
pub use error::{
    ConfigError, FormatError, IoError, MaskError, OutputError, PipelineError, SlideError, TiffError,
};
pub use format::{detect_format, is_tiff_header, SlideFormat, SvsMetadata};
pub use io::{FileRangeReader, MemoryRangeReader, RangeReader};
pub use mask::{BinaryMask, GeneratedMask, MaskedLevel, ThresholdParams};
pub use output::{DryRunEmitter, Emitter, FileEmitter, OutputLayout};
pub use pipeline::{
    LevelProcessor, LevelSelection, OutputCompression, OutputMode, ProcessingParams, RunRecord,
    RunRequest, RunSummary, SlideJob,
};
pub use slide::{InMemorySlide, LevelDescriptor, SlideInfo, SlideSource, TiffSlide};

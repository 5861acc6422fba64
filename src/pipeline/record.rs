//! Run metadata.
//!
//! The record is written as `<stem>_metadata.json`:
//!
//! ```json
//! {
//!   "slide_info": { "name": ..., "dimensions": {...}, ... },
//!   "processing_params": { "threshold": 212, "mask_level": 2, ... },
//!   "levels": { "2": {...}, "0": {...} },
//!   "output": { "path": ..., "is_pyramid": true, "fallback": false }
//! }
//! ```
//!
//! Level entries keep request order.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::slide::{Dimensions, LevelDescriptor, SlideInfo};

use super::params::{OutputCompression, ProcessingParams};

// =============================================================================
// Level Results
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DownsampleFactor {
    pub height: f64,
    pub width: f64,
}

/// Outcome of processing one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelResult {
    #[serde(skip)]
    pub level: usize,

    pub dimensions: Dimensions,
    pub downsample_factor: DownsampleFactor,

    /// `None` when the level could not be read
    pub tissue_percentage: Option<f64>,

    /// File holding this level, `None` if it was not written
    pub output_path: Option<String>,
}

impl LevelResult {
    pub fn new(descriptor: &LevelDescriptor) -> Self {
        Self {
            level: descriptor.index,
            dimensions: Dimensions {
                width: descriptor.width,
                height: descriptor.height,
            },
            downsample_factor: DownsampleFactor {
                height: descriptor.downsample_h,
                width: descriptor.downsample_w,
            },
            tissue_percentage: None,
            output_path: None,
        }
    }
}

/// Level results serialized as a map keyed by level index, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelResults(pub Vec<LevelResult>);

impl LevelResults {
    pub fn get(&self, level: usize) -> Option<&LevelResult> {
        self.0.iter().find(|r| r.level == level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelResult> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for LevelResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in &self.0 {
            map.serialize_entry(&result.level.to_string(), result)?;
        }
        map.end()
    }
}

// =============================================================================
// Run Record
// =============================================================================

/// Parameters as recorded in metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingRecord {
    /// Threshold actually used (explicit or automatic)
    pub threshold: u8,
    pub multiplier: f64,
    pub sigma: f64,
    pub clean_mask: bool,

    /// Only meaningful when cleaning
    pub min_area: Option<u32>,

    pub compression: OutputCompression,
    pub pyramid_mode: bool,
    pub mask_level: usize,
    pub processed_levels: Vec<usize>,

    /// RFC 3339 local time of the run
    pub timestamp: String,
}

impl ProcessingRecord {
    pub fn new(
        params: &ProcessingParams,
        threshold: u8,
        mask_level: usize,
        processed_levels: Vec<usize>,
    ) -> Self {
        Self {
            threshold,
            multiplier: params.otsu_multiplier,
            sigma: params.blur_sigma,
            clean_mask: params.clean_mask,
            min_area: params.clean_mask.then_some(params.min_area_pixels),
            compression: params.compression,
            pyramid_mode: params.is_pyramid(),
            mask_level,
            processed_levels,
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Output summary for single-pyramid runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub path: String,

    /// Whether a multi-page pyramid was written
    pub is_pyramid: bool,

    /// Whether only the highest-resolution level was kept
    pub fallback: bool,
}

/// Everything known about a run, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub slide_info: SlideInfo,
    pub processing_params: ProcessingRecord,
    pub levels: LevelResults,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputRecord>,
}

impl RunRecord {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A finished run: its record plus the levels that failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub record: RunRecord,

    /// `(level, error message)` for every level that was not written
    pub failed_levels: Vec<(usize, String)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed_levels.is_empty()
    }

    pub fn succeeded_levels(&self) -> Vec<usize> {
        self.record
            .levels
            .iter()
            .filter(|r| !self.failed_levels.iter().any(|(l, _)| *l == r.level))
            .map(|r| r.level)
            .collect()
    }
}

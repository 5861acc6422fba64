//! Validated run parameters.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mask::ThresholdParams;

// =============================================================================
// Output Settings
// =============================================================================

/// Lossless compression applied to TIFF output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputCompression {
    #[value(name = "none")]
    None,

    #[default]
    #[value(name = "lzw")]
    Lzw,

    /// Deflate, named after the zlib stream it produces
    #[serde(rename = "zlib")]
    #[value(name = "zlib")]
    Deflate,
}

impl OutputCompression {
    pub const fn as_str(self) -> &'static str {
        match self {
            OutputCompression::None => "none",
            OutputCompression::Lzw => "lzw",
            OutputCompression::Deflate => "zlib",
        }
    }
}

/// How processed levels are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// One file per level
    #[default]
    PerLevelFiles,

    /// One multi-page pyramid file, single-level fallback
    SinglePyramid,
}

// =============================================================================
// ProcessingParams
// =============================================================================

/// Immutable configuration fixed for a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingParams {
    pub threshold: Option<u8>,
    pub otsu_multiplier: f64,
    pub blur_sigma: f64,
    pub clean_mask: bool,
    pub min_area_pixels: u32,
    pub compression: OutputCompression,
    pub output_mode: OutputMode,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            threshold: None,
            otsu_multiplier: 1.05,
            blur_sigma: 1.0,
            clean_mask: false,
            min_area_pixels: 10,
            compression: OutputCompression::Lzw,
            output_mode: OutputMode::PerLevelFiles,
        }
    }
}

impl ProcessingParams {
    /// Check value ranges. Called once at the configuration boundary.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.otsu_multiplier.is_finite() && self.otsu_multiplier > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "multiplier",
                message: format!("must be a positive number, got {}", self.otsu_multiplier),
            });
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "sigma",
                message: format!("must be non-negative, got {}", self.blur_sigma),
            });
        }
        if self.min_area_pixels == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "min_area",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    pub fn threshold_params(&self) -> ThresholdParams {
        ThresholdParams {
            threshold: self.threshold,
            otsu_multiplier: self.otsu_multiplier,
            blur_sigma: self.blur_sigma,
        }
    }

    pub fn is_pyramid(&self) -> bool {
        self.output_mode == OutputMode::SinglePyramid
    }
}

// =============================================================================
// LevelSelection
// =============================================================================

/// Which levels a run processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LevelSelection {
    /// Every level in the catalog
    #[default]
    All,

    /// Levels `0..=n`
    UpTo(usize),

    /// An explicit list, processed in the given order
    Explicit(Vec<usize>),
}

impl LevelSelection {
    /// Parse a comma-separated list such as `"0,2,3"`.
    pub fn parse_list(list: &str) -> Result<Self, ConfigError> {
        let levels = list
            .split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::InvalidLevelList(list.to_string()))?;
        Ok(LevelSelection::Explicit(levels))
    }

    /// Resolve to concrete indices and check them against the catalog size.
    ///
    /// Repeated indices are kept once, at their first position.
    pub fn resolve(&self, level_count: usize) -> Result<Vec<usize>, ConfigError> {
        let requested: Vec<usize> = match self {
            LevelSelection::All => (0..level_count).collect(),
            LevelSelection::UpTo(max) => (0..=*max).collect(),
            LevelSelection::Explicit(levels) => {
                let mut seen = std::collections::HashSet::new();
                levels.iter().copied().filter(|l| seen.insert(*l)).collect()
            }
        };

        if requested.is_empty() {
            return Err(ConfigError::NoLevels);
        }

        let invalid: Vec<usize> = requested
            .iter()
            .copied()
            .filter(|&l| l >= level_count)
            .collect();
        if !invalid.is_empty() {
            return Err(ConfigError::UnknownLevels {
                invalid,
                available: level_count,
            });
        }

        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = ProcessingParams::default().validate().unwrap();
        assert_eq!(params.compression, OutputCompression::Lzw);
        assert!(!params.is_pyramid());
        assert_eq!(params.threshold_params(), ThresholdParams::default());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad_multiplier = ProcessingParams {
            otsu_multiplier: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_multiplier.validate(),
            Err(ConfigError::InvalidParameter { name: "multiplier", .. })
        ));

        let bad_sigma = ProcessingParams {
            blur_sigma: -1.0,
            ..Default::default()
        };
        assert!(bad_sigma.validate().is_err());

        let bad_area = ProcessingParams {
            min_area_pixels: 0,
            ..Default::default()
        };
        assert!(bad_area.validate().is_err());
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(OutputCompression::Deflate.as_str(), "zlib");
        assert_eq!(
            serde_json::to_string(&OutputCompression::Deflate).unwrap(),
            "\"zlib\""
        );
        let parsed: OutputCompression = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, OutputCompression::None);
    }

    #[test]
    fn test_parse_level_list() {
        assert_eq!(
            LevelSelection::parse_list("0, 2,3").unwrap(),
            LevelSelection::Explicit(vec![0, 2, 3])
        );
        assert_eq!(
            LevelSelection::parse_list("0,a"),
            Err(ConfigError::InvalidLevelList("0,a".to_string()))
        );
        assert!(LevelSelection::parse_list("").is_err());
    }

    #[test]
    fn test_resolve_levels() {
        assert_eq!(LevelSelection::All.resolve(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(LevelSelection::UpTo(1).resolve(3).unwrap(), vec![0, 1]);
        assert_eq!(
            LevelSelection::Explicit(vec![2, 0]).resolve(3).unwrap(),
            vec![2, 0]
        );
        assert_eq!(
            LevelSelection::Explicit(vec![1, 0, 1]).resolve(3).unwrap(),
            vec![1, 0]
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_levels() {
        assert_eq!(
            LevelSelection::Explicit(vec![0, 5, 7]).resolve(3),
            Err(ConfigError::UnknownLevels {
                invalid: vec![5, 7],
                available: 3
            })
        );
        assert!(LevelSelection::UpTo(3).resolve(3).is_err());
        assert_eq!(
            LevelSelection::Explicit(vec![]).resolve(3),
            Err(ConfigError::NoLevels)
        );
    }
}

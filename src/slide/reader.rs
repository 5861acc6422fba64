//! Format-agnostic slide access.
//!
//! The masking pipeline only needs the level catalog, the slide identity and
//! "read this whole level as pixels"; [`SlideSource`] is that seam.

use async_trait::async_trait;
use image::RgbImage;

use crate::error::SlideError;

use super::catalog::{LevelDescriptor, SlideInfo};

/// An opened multi-resolution slide.
#[async_trait]
pub trait SlideSource: Send + Sync {
    /// Identity of the slide.
    fn info(&self) -> &SlideInfo;

    /// Level catalog, level 0 first.
    fn levels(&self) -> &[LevelDescriptor];

    fn level_count(&self) -> usize {
        self.levels().len()
    }

    fn level_descriptor(&self, index: usize) -> Option<LevelDescriptor> {
        self.levels().get(index).copied()
    }

    /// Read a full level into an RGB pixel buffer of the level's dimensions.
    async fn read_level(&self, index: usize) -> Result<RgbImage, SlideError>;
}

/// Slide held entirely in memory, one buffer per level.
///
/// Used when levels are produced by another stage, and by tests.
#[derive(Debug, Clone)]
pub struct InMemorySlide {
    info: SlideInfo,
    levels: Vec<LevelDescriptor>,
    pixels: Vec<RgbImage>,
}

impl InMemorySlide {
    /// Build a slide from level buffers ordered from largest to smallest.
    pub fn new(path: impl AsRef<std::path::Path>, pixels: Vec<RgbImage>) -> Self {
        let dims: Vec<(u32, u32)> = pixels.iter().map(|p| p.dimensions()).collect();
        let levels = LevelDescriptor::from_dimensions(&dims);
        let info = SlideInfo::new(path.as_ref(), "memory", &levels);

        Self {
            info,
            levels,
            pixels,
        }
    }
}

#[async_trait]
impl SlideSource for InMemorySlide {
    fn info(&self) -> &SlideInfo {
        &self.info
    }

    fn levels(&self) -> &[LevelDescriptor] {
        &self.levels
    }

    async fn read_level(&self, index: usize) -> Result<RgbImage, SlideError> {
        self.pixels
            .get(index)
            .cloned()
            .ok_or(SlideError::LevelOutOfRange {
                level: index,
                count: self.pixels.len(),
            })
    }
}

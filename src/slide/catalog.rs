//! Level catalog and slide identity.

use serde::Serialize;

/// Largest mask-level dimension chosen automatically.
pub const DEFAULT_MASK_MAX_DIMENSION: u32 = 4096;

// =============================================================================
// Level Descriptor
// =============================================================================

/// Static description of one pyramid level.
///
/// Index 0 is full resolution; increasing indices have decreasing resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelDescriptor {
    pub index: usize,
    pub width: u32,
    pub height: u32,

    /// `level0_height / height`
    pub downsample_h: f64,

    /// `level0_width / width`
    pub downsample_w: f64,
}

impl LevelDescriptor {
    /// Build descriptors for a list of `(width, height)` pairs, level 0 first.
    pub fn from_dimensions(dimensions: &[(u32, u32)]) -> Vec<LevelDescriptor> {
        let Some(&(base_w, base_h)) = dimensions.first() else {
            return Vec::new();
        };

        dimensions
            .iter()
            .enumerate()
            .map(|(index, &(width, height))| LevelDescriptor {
                index,
                width,
                height,
                downsample_h: base_h as f64 / height as f64,
                downsample_w: base_w as f64 / width as f64,
            })
            .collect()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Choose the level the mask is generated on.
///
/// Picks the highest-resolution level whose width and height are both at
/// most `max_dimension`; when every level is larger, the coarsest level.
pub fn select_mask_level(levels: &[LevelDescriptor], max_dimension: u32) -> usize {
    levels
        .iter()
        .find(|l| l.width <= max_dimension && l.height <= max_dimension)
        .or(levels.last())
        .map(|l| l.index)
        .unwrap_or(0)
}

// =============================================================================
// Slide Identity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Identity of an opened slide, recorded verbatim in run metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideInfo {
    /// File stem
    pub name: String,

    pub path: String,

    /// Extension including the leading dot, empty if none
    pub suffix: String,

    pub backend_name: String,

    /// Level 0 dimensions
    pub dimensions: Dimensions,

    pub level_count: usize,

    /// `[x, y, width, height]` of the region holding image data
    pub data_bounds: [u32; 4],

    #[serde(skip)]
    pub mpp: Option<f64>,

    #[serde(skip)]
    pub magnification: Option<f64>,
}

impl SlideInfo {
    pub fn new(
        path: &std::path::Path,
        backend_name: &str,
        levels: &[LevelDescriptor],
    ) -> Self {
        let (width, height) = levels.first().map(|l| l.dimensions()).unwrap_or((0, 0));

        SlideInfo {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.display().to_string(),
            suffix: path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default(),
            backend_name: backend_name.to_string(),
            dimensions: Dimensions { width, height },
            level_count: levels.len(),
            data_bounds: [0, 0, width, height],
            mpp: None,
            magnification: None,
        }
    }
}

//! Pyramid level identification.
//!
//! A slide file holds several IFDs: the pyramid levels plus label, macro and
//! thumbnail images. Pyramid levels are the tiled IFDs whose aspect ratio
//! matches the largest tiled image; they are ordered by decreasing area so
//! that level 0 is full resolution.

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::tags::{Compression, TiffTag};
use super::values::ValueReader;

// =============================================================================
// Constants
// =============================================================================

/// Upper bound on the IFD chain length; guards against offset cycles
const MAX_IFDS: usize = 128;

/// Absolute slack (pixels) allowed when checking a level's height against the
/// height implied by its width ratio
const ASPECT_SLACK_PIXELS: f64 = 2.0;

/// Relative slack allowed for the same check
const ASPECT_SLACK_RATIO: f64 = 0.05;

// =============================================================================
// PyramidLevel
// =============================================================================

/// A single resolution level of the pyramid.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    /// Position in the pyramid (0 = highest resolution)
    pub level_index: usize,

    /// Position of the IFD in the file's chain
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,

    /// `base_height / height`
    pub downsample_h: f64,

    /// `base_width / width`
    pub downsample_w: f64,

    pub compression: Compression,
    pub samples_per_pixel: u16,

    /// 1 = interleaved, 2 = separate planes
    pub planar_configuration: u16,

    pub ifd: Ifd,
}

impl PyramidLevel {
    /// Build a level from an IFD; `None` when the IFD is not tiled or
    /// carries no tile data.
    fn from_ifd(ifd: Ifd, ifd_index: usize, header: &TiffHeader) -> Option<Self> {
        let order = header.byte_order;
        let tile_width = ifd.tile_width(order)?;
        let tile_height = ifd.tile_height(order)?;
        let width = ifd.image_width(order)?;
        let height = ifd.image_height(order)?;

        if tile_width == 0 || tile_height == 0 || width == 0 || height == 0 {
            return None;
        }
        if !ifd.has_tag(TiffTag::TileOffsets) || !ifd.has_tag(TiffTag::TileByteCounts) {
            return None;
        }

        let compression = Compression::from_u16(ifd.compression(order).unwrap_or(1));
        let samples_per_pixel = ifd
            .get_u32(TiffTag::SamplesPerPixel, order)
            .unwrap_or(1) as u16;
        let planar_configuration = ifd
            .get_u32(TiffTag::PlanarConfiguration, order)
            .unwrap_or(1) as u16;

        Some(PyramidLevel {
            level_index: 0,
            ifd_index,
            width,
            height,
            tile_width,
            tile_height,
            tiles_x: width.div_ceil(tile_width),
            tiles_y: height.div_ceil(tile_height),
            downsample_h: 1.0,
            downsample_w: 1.0,
            compression,
            samples_per_pixel,
            planar_configuration,
            ifd,
        })
    }

    pub fn tile_count(&self) -> u32 {
        self.tiles_x * self.tiles_y
    }

    /// Row-major index of a tile, `None` outside the grid.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<u32> {
        if tile_x >= self.tiles_x || tile_y >= self.tiles_y {
            return None;
        }
        Some(tile_y * self.tiles_x + tile_x)
    }

    /// Reject levels whose tiles this reader cannot turn into RGB pixels.
    pub fn validate_decodable(&self) -> Result<(), TiffError> {
        if !self.compression.is_supported() {
            return Err(TiffError::UnsupportedCompression(self.compression.name()));
        }
        if self.planar_configuration != 1 {
            return Err(TiffError::UnsupportedLayout(format!(
                "level {} uses planar configuration {}",
                self.level_index, self.planar_configuration
            )));
        }
        if self.compression == Compression::None && !matches!(self.samples_per_pixel, 1 | 3 | 4) {
            return Err(TiffError::UnsupportedLayout(format!(
                "level {} has {} samples per pixel",
                self.level_index, self.samples_per_pixel
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TiffPyramid
// =============================================================================

/// The parsed pyramid of a tiled TIFF file.
#[derive(Debug, Clone)]
pub struct TiffPyramid {
    pub header: TiffHeader,

    /// Levels ordered by decreasing resolution
    pub levels: Vec<PyramidLevel>,

    /// ImageDescription of the first IFD, if any
    pub description: Option<String>,

    /// Number of IFDs in the file, pyramid or not
    pub ifd_count: usize,

    /// IFDs that are not pyramid levels, in file order
    pub associated: Vec<AssociatedImage>,
}

// =============================================================================
// Associated Images
// =============================================================================

/// A non-pyramid image stored alongside the levels (thumbnail, label, macro).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociatedImage {
    /// `label`, `macro`, `thumbnail`, or `image<ifd>` when unrecognised
    pub name: String,

    #[serde(skip)]
    pub ifd_index: usize,

    pub width: u32,
    pub height: u32,
}

/// Name an associated image from its description; Aperio files keep the
/// thumbnail in the second IFD without describing it.
fn associated_name(ifd_index: usize, description: Option<&str>) -> String {
    let description = description.unwrap_or_default().to_ascii_lowercase();
    if description.contains("label") {
        "label".to_string()
    } else if description.contains("macro") {
        "macro".to_string()
    } else if ifd_index == 1 {
        "thumbnail".to_string()
    } else {
        format!("image{}", ifd_index)
    }
}

struct IfdSummary {
    index: usize,
    dimensions: Option<(u32, u32)>,
    description: Option<String>,
}

fn collect_associated(ifds: &[IfdSummary], levels: &[PyramidLevel]) -> Vec<AssociatedImage> {
    let mut associated: Vec<AssociatedImage> = Vec::new();
    for ifd in ifds {
        if levels.iter().any(|l| l.ifd_index == ifd.index) {
            continue;
        }
        let Some((width, height)) = ifd.dimensions else {
            continue;
        };

        let mut name = associated_name(ifd.index, ifd.description.as_deref());
        if associated.iter().any(|a| a.name == name) {
            name = format!("{}_{}", name, ifd.index);
        }
        associated.push(AssociatedImage {
            name,
            ifd_index: ifd.index,
            width,
            height,
        });
    }
    associated
}

impl TiffPyramid {
    /// Parse the header and IFD chain and identify pyramid levels.
    pub async fn parse<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let header_len = (reader.size() as usize).min(BIGTIFF_HEADER_SIZE);
        if header_len < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: reader.size(),
            });
        }
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, reader.size())?;

        let ifds = read_ifd_chain(reader, &header).await?;
        let ifd_count = ifds.len();

        let values = ValueReader::new(reader, &header);
        let order = header.byte_order;
        let mut summaries = Vec::with_capacity(ifd_count);
        for (index, ifd) in ifds.iter().enumerate() {
            // Only the first description drives format detection
            let description = match ifd.get_entry_by_tag(TiffTag::ImageDescription) {
                Some(entry) if index == 0 => Some(values.read_string(entry).await?),
                Some(entry) => values.read_string(entry).await.ok(),
                None => None,
            };
            summaries.push(IfdSummary {
                index,
                dimensions: ifd.image_width(order).zip(ifd.image_height(order)),
                description,
            });
        }
        let description = summaries.first().and_then(|s| s.description.clone());

        let candidates: Vec<PyramidLevel> = ifds
            .into_iter()
            .enumerate()
            .filter_map(|(index, ifd)| PyramidLevel::from_ifd(ifd, index, &header))
            .collect();

        let levels = select_levels(candidates);
        if levels.is_empty() {
            return Err(TiffError::NoPyramidLevels);
        }
        let associated = collect_associated(&summaries, &levels);

        debug!(
            ifds = ifd_count,
            levels = levels.len(),
            associated = associated.len(),
            bigtiff = header.is_bigtiff,
            "Parsed TIFF pyramid"
        );

        Ok(TiffPyramid {
            header,
            levels,
            description,
            ifd_count,
            associated,
        })
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn get_level(&self, level: usize) -> Option<&PyramidLevel> {
        self.levels.get(level)
    }

    /// Dimensions of level 0.
    pub fn dimensions(&self) -> (u32, u32) {
        self.levels
            .first()
            .map(|l| (l.width, l.height))
            .unwrap_or((0, 0))
    }
}

/// Follow the next-IFD chain from the header's first offset.
async fn read_ifd_chain<R: RangeReader>(
    reader: &R,
    header: &TiffHeader,
) -> Result<Vec<Ifd>, TiffError> {
    let mut ifds = Vec::new();
    let mut offset = header.first_ifd_offset;

    while offset != 0 && ifds.len() < MAX_IFDS {
        if offset >= reader.size() {
            return Err(TiffError::InvalidIfdOffset(offset));
        }
        let count_bytes = reader
            .read_exact_at(offset, header.ifd_count_size())
            .await?;
        let entry_count = header.read_entry_count(&count_bytes);

        let size = Ifd::calculate_size(entry_count, header);
        let bytes = reader.read_exact_at(offset, size).await?;
        let ifd = Ifd::parse(&bytes, header)?;

        offset = ifd.next_ifd_offset;
        ifds.push(ifd);
    }

    Ok(ifds)
}

/// Sort candidates by area and keep those consistent with the largest one.
///
/// A candidate is kept when its height matches `base_height / downsample_w`
/// within a small tolerance; label and macro images have a different aspect
/// ratio and fall out here.
fn select_levels(mut candidates: Vec<PyramidLevel>) -> Vec<PyramidLevel> {
    candidates.sort_by_key(|l| std::cmp::Reverse(l.width as u64 * l.height as u64));

    let Some(base) = candidates.first() else {
        return Vec::new();
    };
    let base_width = base.width as f64;
    let base_height = base.height as f64;

    let mut levels: Vec<PyramidLevel> = Vec::new();
    for mut level in candidates {
        let downsample_w = base_width / level.width as f64;
        let expected_height = base_height / downsample_w;
        let tolerance = ASPECT_SLACK_PIXELS.max(expected_height * ASPECT_SLACK_RATIO);

        if (level.height as f64 - expected_height).abs() > tolerance {
            debug!(
                ifd = level.ifd_index,
                width = level.width,
                height = level.height,
                "Skipping tiled IFD with inconsistent aspect ratio"
            );
            continue;
        }
        if levels
            .last()
            .is_some_and(|prev| prev.width == level.width && prev.height == level.height)
        {
            continue;
        }

        level.level_index = levels.len();
        level.downsample_w = downsample_w;
        level.downsample_h = base_height / level.height as f64;
        levels.push(level);
    }

    levels
}

// =============================================================================
// Tile Data
// =============================================================================

/// Tile locations and shared JPEG tables of one level.
#[derive(Debug, Clone)]
pub struct TileData {
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub jpeg_tables: Option<Bytes>,
}

impl TileData {
    pub async fn load<R: RangeReader>(
        reader: &R,
        level: &PyramidLevel,
        header: &TiffHeader,
    ) -> Result<Self, TiffError> {
        let values = ValueReader::new(reader, header);

        let offsets = values
            .read_u64_array(required_entry(level, TiffTag::TileOffsets, "TileOffsets")?)
            .await?;
        let byte_counts = values
            .read_u64_array(required_entry(
                level,
                TiffTag::TileByteCounts,
                "TileByteCounts",
            )?)
            .await?;

        let expected = level.tile_count() as usize;
        if offsets.len() < expected || byte_counts.len() < expected {
            return Err(TiffError::InvalidTagValue {
                tag: "TileOffsets",
                message: format!(
                    "level {} needs {} tiles, found {} offsets and {} byte counts",
                    level.level_index,
                    expected,
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let jpeg_tables = match level.ifd.get_entry_by_tag(TiffTag::JpegTables) {
            Some(entry) => Some(values.read_bytes(entry).await?),
            None => None,
        };

        Ok(TileData {
            offsets,
            byte_counts,
            jpeg_tables,
        })
    }

    /// `(offset, byte_count)` of a tile.
    pub fn tile_location(&self, tile_index: u32) -> Option<(u64, u64)> {
        let i = tile_index as usize;
        Some((*self.offsets.get(i)?, *self.byte_counts.get(i)?))
    }
}

fn required_entry<'a>(
    level: &'a PyramidLevel,
    tag: TiffTag,
    name: &'static str,
) -> Result<&'a IfdEntry, TiffError> {
    level
        .ifd
        .get_entry_by_tag(tag)
        .ok_or_else(|| TiffError::InvalidTagValue {
            tag: name,
            message: "missing".to_string(),
        })
}

// =============================================================================
// Tests
// =============================================================================

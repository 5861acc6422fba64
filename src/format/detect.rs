//! Slide format detection.
//!
//! - **Aperio SVS**: TIFF whose first ImageDescription contains "Aperio"
//! - **Generic Pyramidal TIFF**: any other tiled, multi-resolution TIFF
//!
//! Anything that is not a TIFF is rejected as unsupported.

use crate::error::FormatError;

use super::tiff::{ByteOrder, TIFF_HEADER_SIZE};

/// Marker string for Aperio SVS format.
const APERIO_MARKER: &str = "Aperio";

/// Detected slide format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideFormat {
    /// Aperio SVS (tiled JPEG with abbreviated streams)
    AperioSvs,

    /// Generic pyramidal TIFF
    GenericTiff,
}

impl SlideFormat {
    /// Human-readable format name.
    pub const fn name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "Aperio SVS",
            SlideFormat::GenericTiff => "Generic Pyramidal TIFF",
        }
    }

    /// Name of the reader backend recorded in run metadata.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            SlideFormat::AperioSvs => "svs",
            SlideFormat::GenericTiff => "tiff",
        }
    }
}

/// Classify a TIFF by the ImageDescription of its first IFD.
pub fn detect_format(header: &[u8], description: Option<&str>) -> Result<SlideFormat, FormatError> {
    if !is_tiff_header(header) {
        return Err(FormatError::UnsupportedFormat {
            reason: "not a TIFF or BigTIFF file".to_string(),
        });
    }

    match description {
        Some(d) if d.contains(APERIO_MARKER) => Ok(SlideFormat::AperioSvs),
        _ => Ok(SlideFormat::GenericTiff),
    }
}

/// Quick check for TIFF or BigTIFF magic and version.
pub fn is_tiff_header(bytes: &[u8]) -> bool {
    if bytes.len() < TIFF_HEADER_SIZE {
        return false;
    }

    let order = match &bytes[0..2] {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        _ => return false,
    };
    matches!(order.read_u16(&bytes[2..4]), 42 | 43)
}

use std::path::PathBuf;

use thiserror::Error;

/// I/O errors that can occur when reading slide bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Underlying read failed
    #[error("Read error on {identifier}: {message}")]
    Read { identifier: String, message: String },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Errors related to format detection and validation
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// TIFF parsing error
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File format is not supported
    #[error("Unsupported format: {reason}")]
    UnsupportedFormat { reason: String },
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or to invalid location)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unsupported compression scheme on a pyramid level
    #[error("Unsupported compression: {0} (only JPEG and uncompressed tiles are supported)")]
    UnsupportedCompression(String),

    /// Unsupported pixel layout on a pyramid level
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),

    /// No tiled IFD could be identified as a pyramid level
    #[error("No pyramid levels found")]
    NoPyramidLevels,
}

/// Errors raised while reading pixel data from an opened slide
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Tiff(#[from] TiffError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// Level index is not part of the pyramid
    #[error("Level {level} out of range (slide has {count} levels)")]
    LevelOutOfRange { level: usize, count: usize },

    /// A tile could not be decoded into pixels
    #[error("Failed to decode tile ({tile_x}, {tile_y}) of level {level}: {message}")]
    TileDecode {
        level: usize,
        tile_x: u32,
        tile_y: u32,
        message: String,
    },

    /// An associated image could not be decoded
    #[error("Failed to decode associated image '{name}': {message}")]
    AssociatedDecode { name: String, message: String },
}

/// Errors raised by mask operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaskError {
    /// Mask and pixel buffer do not cover the same grid
    #[error("Mask shape {mask_width}x{mask_height} does not match image shape {image_width}x{image_height}")]
    ShapeMismatch {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },
}

/// Configuration errors. These are fatal and raised before any processing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Input slide does not exist
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    /// One or more requested levels are not in the level catalog
    #[error("Invalid level(s): {invalid:?}. Available levels: 0..{available}")]
    UnknownLevels { invalid: Vec<usize>, available: usize },

    /// Requested level list is empty
    #[error("No levels requested")]
    NoLevels,

    /// Level list could not be parsed
    #[error("Invalid level format in '{0}'. Please provide comma-separated integers.")]
    InvalidLevelList(String),

    /// A processing parameter is out of range
    #[error("Invalid value for {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Batch configuration file is missing or malformed
    #[error("Batch configuration error: {0}")]
    Batch(String),
}

/// Errors raised while persisting outputs
#[derive(Debug, Clone, Error)]
pub enum OutputError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Image could not be encoded
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The output path has an extension no encoder handles
    #[error("Unsupported output extension for {0} (expected .tif, .tiff or .png)")]
    UnsupportedExtension(PathBuf),
}

impl OutputError {
    pub(crate) fn io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        OutputError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn encode(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        OutputError::Encode {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

/// Run-level error for the masking pipeline
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unsupported slide: {0}")]
    Format(#[from] FormatError),

    #[error("Slide error: {0}")]
    Slide(#[from] SlideError),

    #[error("Mask error: {0}")]
    Mask(#[from] MaskError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

//! Slide container formats.
//!
//! Supported inputs are TIFF-based pyramids:
//!
//! - **Aperio SVS**: identified by the "Aperio" marker in ImageDescription
//! - **Generic Pyramidal TIFF**: any other tiled TIFF with a pyramid
//!
//! Tiles must be JPEG or uncompressed; other codecs are rejected at open.

pub mod detect;
pub mod jpeg;
pub mod svs;
pub mod tiff;

pub use detect::{detect_format, is_tiff_header, SlideFormat};
pub use svs::SvsMetadata;

//! Tissue mask operations.
//!
//! All operations are pure functions over [`BinaryMask`] and RGB buffers:
//!
//! ```text
//! generate ──► clean (optional) ──► scale (per level) ──► apply (per level)
//! ```
//!
//! - [`generate`]: grayscale, Gaussian blur, explicit or Otsu threshold
//! - [`clean`]: drop small tissue components, fill small enclosed holes
//! - [`scale`]: nearest-neighbour resampling onto another level's grid
//! - [`apply`]: whiten background pixels and measure tissue coverage

mod apply;
mod clean;
mod generate;
mod scale;
mod types;

pub use apply::{apply, MaskedLevel, BACKGROUND_PIXEL};
pub use clean::clean;
pub use generate::{generate, GeneratedMask, ThresholdParams};
pub use scale::scale;
pub use types::{BinaryMask, BACKGROUND, TISSUE};

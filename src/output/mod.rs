//! Output files: naming and writers.
//!
//! - [`OutputLayout`]: derives level, mask and metadata paths from the output path
//! - [`associated_image_path`]: names exported thumbnail, label and macro images
//! - [`Emitter`]: the seam the pipeline writes through
//! - [`FileEmitter`]: TIFF (none/LZW/Deflate), PNG and JSON on the local filesystem
//! - [`DryRunEmitter`]: logs instead of writing

mod emitter;
mod file;
mod layout;

pub use emitter::{DryRunEmitter, Emitter};
pub use file::FileEmitter;
pub use layout::{associated_image_path, OutputLayout};

//! Slide abstraction layer.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             LevelProcessor              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           SlideSource trait             │
//! │  (level catalog + read full level)      │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  TiffSlide<R>   │    │   InMemorySlide     │
//! │ (SVS / TIFF)    │    │ (pre-decoded levels)│
//! └─────────────────┘    └─────────────────────┘
//! ```

mod associated;
mod catalog;
mod reader;
mod tiff_slide;

pub use associated::read_associated;
pub use catalog::{
    select_mask_level, Dimensions, LevelDescriptor, SlideInfo, DEFAULT_MASK_MAX_DIMENSION,
};
pub use reader::{InMemorySlide, SlideSource};
pub use tiff_slide::TiffSlide;

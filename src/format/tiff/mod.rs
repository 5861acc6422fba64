//! Tiled TIFF and BigTIFF parsing.
//!
//! - **Byte order**: declared in the header (II = little-endian, MM =
//!   big-endian); every multi-byte value is read through it.
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets, handled
//!   transparently.
//! - **IFD**: one directory per image; slides carry pyramid levels plus label
//!   and macro images.

mod parser;
mod pyramid;
mod tags;
mod values;

pub use parser::{ByteOrder, Ifd, IfdEntry, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use pyramid::{AssociatedImage, PyramidLevel, TiffPyramid, TileData};
pub use tags::{Compression, FieldType, TiffTag};
pub use values::ValueReader;

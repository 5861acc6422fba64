//! JPEG tile handling.
//!
//! Aperio SVS tiles are "abbreviated" JPEG streams: they lack the
//! quantization (DQT) and Huffman (DHT) tables, which are stored once in the
//! level's `JPEGTables` tag. Before decoding, the tables are spliced in:
//!
//! ```text
//! tables: SOI + DQT/DHT ... + EOI
//! tile:   SOI + SOS ... + EOI
//! merged: SOI + DQT/DHT ... + SOS ... + EOI
//! ```

use bytes::{Bytes, BytesMut};
use image::{ImageFormat, RgbImage};

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Quantization Table marker
pub const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
pub const SOS: [u8; 2] = [0xFF, 0xDA];

/// Whether a stream carries its own quantization tables.
pub fn has_quantization_tables(data: &[u8]) -> bool {
    data.starts_with(&SOI) && data[2..].windows(2).any(|w| w == DQT)
}

/// Splice `tables` in front of an abbreviated tile stream.
///
/// The trailing EOI of the tables and the leading SOI of the tile are
/// dropped so the result holds exactly one of each.
pub fn merge_jpeg_tables(tables: &[u8], tile: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile);
    }
    if tile.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI).unwrap_or(tables);
    let tile = tile.strip_prefix(&SOI).unwrap_or(tile);

    let mut merged = BytesMut::with_capacity(tables.len() + tile.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(tile);
    merged.freeze()
}

/// Produce a self-contained JPEG stream for a tile.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !has_quantization_tables(tile) => merge_jpeg_tables(tables, tile),
        _ => Bytes::copy_from_slice(tile),
    }
}

/// Decode a complete JPEG stream into RGB pixels.
///
/// Grayscale and CMYK streams are converted to RGB.
pub fn decode_jpeg(data: &[u8]) -> Result<RgbImage, String> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| e.to_string())
}

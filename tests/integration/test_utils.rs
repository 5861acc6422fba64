//! Test utilities for integration tests.
//!
//! Builds small tiled pyramid TIFFs in memory so tests can exercise the full
//! read path without real slide files.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};
use std::path::{Path, PathBuf};

// =============================================================================
// Synthetic Pixels
// =============================================================================

pub const TISSUE_PIXEL: Rgb<u8> = Rgb([120, 60, 140]);
pub const GLASS_PIXEL: Rgb<u8> = Rgb([245, 245, 245]);

/// A bright slide with one dark rectangle covering the left `fraction` of
/// the width.
pub fn tissue_slide_level(width: u32, height: u32, fraction: f64) -> RgbImage {
    let edge = (width as f64 * fraction).round() as u32;
    RgbImage::from_fn(width, height, |x, _| {
        if x < edge {
            TISSUE_PIXEL
        } else {
            GLASS_PIXEL
        }
    })
}

/// Levels of a power-of-two pyramid, level 0 first.
pub fn tissue_pyramid(width: u32, height: u32, count: u32) -> Vec<RgbImage> {
    (0..count)
        .map(|i| tissue_slide_level(width >> i, height >> i, 0.5))
        .collect()
}

// =============================================================================
// TIFF Builder
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileEncoding {
    Uncompressed,
    Jpeg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

/// Builder for tiled, multi-IFD RGB TIFF files.
pub struct PyramidTiffBuilder {
    levels: Vec<RgbImage>,
    tile_size: u32,
    encoding: TileEncoding,
    compression_tag: Option<u16>,
    description: Option<String>,
    page_descriptions: Vec<(usize, String)>,
    byte_order: ByteOrderType,
    is_bigtiff: bool,
}

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const LONG8: u16 = 16;

struct Entry {
    tag: u16,
    field_type: u16,
    count: u64,
    bytes: Vec<u8>,
}

impl PyramidTiffBuilder {
    pub fn new(levels: Vec<RgbImage>) -> Self {
        Self {
            levels,
            tile_size: 16,
            encoding: TileEncoding::Uncompressed,
            compression_tag: None,
            description: None,
            page_descriptions: Vec::new(),
            byte_order: ByteOrderType::LittleEndian,
            is_bigtiff: false,
        }
    }

    pub fn tile_size(mut self, size: u32) -> Self {
        self.tile_size = size;
        self
    }

    pub fn encoding(mut self, encoding: TileEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Override the Compression tag without changing how tiles are stored.
    pub fn compression_tag(mut self, value: u16) -> Self {
        self.compression_tag = Some(value);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// ImageDescription for a page other than the first.
    pub fn page_description(mut self, index: usize, description: impl Into<String>) -> Self {
        self.page_descriptions.push((index, description.into()));
        self
    }

    pub fn byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    pub fn bigtiff(mut self, is_bigtiff: bool) -> Self {
        self.is_bigtiff = is_bigtiff;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(match self.byte_order {
            ByteOrderType::LittleEndian => b"II",
            ByteOrderType::BigEndian => b"MM",
        });

        let mut next_pointer_pos;
        if self.is_bigtiff {
            self.put(&mut data, 43, 2);
            self.put(&mut data, 8, 2);
            self.put(&mut data, 0, 2);
            next_pointer_pos = data.len();
            self.put(&mut data, 0, 8);
        } else {
            self.put(&mut data, 42, 2);
            next_pointer_pos = data.len();
            self.put(&mut data, 0, 4);
        }

        for (index, level) in self.levels.iter().enumerate() {
            let (offsets, counts) = self.write_tiles(&mut data, level);
            let entries = self.entries(index, level, &offsets, &counts);

            if data.len() % 2 == 1 {
                data.push(0);
            }
            let ifd_offset = data.len() as u64;
            self.patch(&mut data, next_pointer_pos, ifd_offset);
            next_pointer_pos = self.write_ifd(&mut data, entries);
        }

        data
    }

    fn write_tiles(&self, data: &mut Vec<u8>, level: &RgbImage) -> (Vec<u64>, Vec<u64>) {
        let ts = self.tile_size;
        let tiles_x = level.width().div_ceil(ts);
        let tiles_y = level.height().div_ceil(ts);
        let mut offsets = Vec::new();
        let mut counts = Vec::new();

        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let mut tile = RgbImage::from_pixel(ts, ts, Rgb([0, 0, 0]));
                imageops::replace(&mut tile, level, -((tx * ts) as i64), -((ty * ts) as i64));

                let bytes = match self.encoding {
                    TileEncoding::Uncompressed => tile.into_raw(),
                    TileEncoding::Jpeg => {
                        let mut buf = Vec::new();
                        JpegEncoder::new_with_quality(&mut buf, 95)
                            .encode_image(&tile)
                            .unwrap();
                        buf
                    }
                };
                offsets.push(data.len() as u64);
                counts.push(bytes.len() as u64);
                data.extend_from_slice(&bytes);
            }
        }

        (offsets, counts)
    }

    fn entries(&self, index: usize, level: &RgbImage, offsets: &[u64], counts: &[u64]) -> Vec<Entry> {
        let compression = self.compression_tag.unwrap_or(match self.encoding {
            TileEncoding::Uncompressed => 1,
            TileEncoding::Jpeg => 7,
        });

        let mut entries = vec![
            self.scalar(256, LONG, level.width() as u64),
            self.scalar(257, LONG, level.height() as u64),
            self.scalar(258, SHORT, 8),
            self.scalar(259, SHORT, compression as u64),
            self.scalar(262, SHORT, 2),
            self.scalar(277, SHORT, 3),
            self.scalar(284, SHORT, 1),
            self.scalar(322, LONG, self.tile_size as u64),
            self.scalar(323, LONG, self.tile_size as u64),
            self.array(324, offsets),
            self.array(325, counts),
        ];

        let description = if index == 0 {
            self.description.as_ref()
        } else {
            self.page_descriptions
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, d)| d)
        };
        if let Some(description) = description {
            let mut bytes = description.as_bytes().to_vec();
            bytes.push(0);
            entries.push(Entry {
                tag: 270,
                field_type: ASCII,
                count: bytes.len() as u64,
                bytes,
            });
        }

        entries.sort_by_key(|e| e.tag);
        entries
    }

    fn scalar(&self, tag: u16, field_type: u16, value: u64) -> Entry {
        let mut bytes = Vec::new();
        self.put(&mut bytes, value, if field_type == SHORT { 2 } else { 4 });
        Entry {
            tag,
            field_type,
            count: 1,
            bytes,
        }
    }

    fn array(&self, tag: u16, values: &[u64]) -> Entry {
        let (field_type, size) = if self.is_bigtiff { (LONG8, 8) } else { (LONG, 4) };
        let mut bytes = Vec::new();
        for &v in values {
            self.put(&mut bytes, v, size);
        }
        Entry {
            tag,
            field_type,
            count: values.len() as u64,
            bytes,
        }
    }

    /// Write an IFD and its out-of-line values; returns the position of its
    /// next-IFD pointer.
    fn write_ifd(&self, data: &mut Vec<u8>, entries: Vec<Entry>) -> usize {
        let (count_size, entry_size, inline_size) = if self.is_bigtiff { (8, 20, 8) } else { (2, 12, 4) };
        let ifd_start = data.len();
        let ifd_size = count_size + entries.len() * entry_size + inline_size;
        let mut external_offset = (ifd_start + ifd_size) as u64;
        let mut external = Vec::new();

        self.put(data, entries.len() as u64, count_size);
        for entry in &entries {
            self.put(data, entry.tag as u64, 2);
            self.put(data, entry.field_type as u64, 2);
            self.put(data, entry.count, inline_size);

            if entry.bytes.len() <= inline_size {
                let mut inline = entry.bytes.clone();
                inline.resize(inline_size, 0);
                data.extend_from_slice(&inline);
            } else {
                self.put(data, external_offset, inline_size);
                external.extend_from_slice(&entry.bytes);
                if external.len() % 2 == 1 {
                    external.push(0);
                }
                external_offset = (ifd_start + ifd_size + external.len()) as u64;
            }
        }

        let next_pointer_pos = data.len();
        self.put(data, 0, inline_size);
        data.extend_from_slice(&external);
        next_pointer_pos
    }

    fn put(&self, data: &mut Vec<u8>, value: u64, size: usize) {
        let bytes = match self.byte_order {
            ByteOrderType::LittleEndian => value.to_le_bytes(),
            ByteOrderType::BigEndian => value.to_be_bytes(),
        };
        match self.byte_order {
            ByteOrderType::LittleEndian => data.extend_from_slice(&bytes[..size]),
            ByteOrderType::BigEndian => data.extend_from_slice(&bytes[8 - size..]),
        }
    }

    fn patch(&self, data: &mut [u8], pos: usize, value: u64) {
        let size = if self.is_bigtiff { 8 } else { 4 };
        let mut bytes = Vec::new();
        self.put(&mut bytes, value, size);
        data[pos..pos + size].copy_from_slice(&bytes);
    }
}

// =============================================================================
// Files
// =============================================================================

pub const APERIO_DESCRIPTION: &str =
    "Aperio Image Library v12.0.15\r\n1024x768 [0,0 1024x768] (256x256) JPEG/RGB Q=70|AppMag = 20|MPP = 0.4990";

/// Write `data` to `<dir>/<name>` and return the path.
pub fn write_slide(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Decode every page of a TIFF written by the pipeline.
pub fn read_tiff_pages(path: &Path) -> Vec<RgbImage> {
    use tiff::decoder::{Decoder, DecodingResult};

    let mut decoder = Decoder::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut pages = Vec::new();
    loop {
        let (width, height) = decoder.dimensions().unwrap();
        let DecodingResult::U8(data) = decoder.read_image().unwrap() else {
            panic!("expected 8-bit pages");
        };
        pages.push(RgbImage::from_raw(width, height, data).unwrap());
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    pages
}

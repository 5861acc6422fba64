//! Slides backed by a tiled TIFF pyramid (Aperio SVS or generic).

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use image::{imageops, GrayImage, Rgb, RgbImage, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{FormatError, SlideError};
use crate::format::jpeg::{decode_jpeg, prepare_tile_jpeg};
use crate::format::tiff::{AssociatedImage, Compression, PyramidLevel, TiffPyramid, TileData, TIFF_HEADER_SIZE};
use crate::format::{detect_format, SlideFormat, SvsMetadata};
use crate::io::{FileRangeReader, RangeReader};

use super::catalog::{LevelDescriptor, SlideInfo};
use super::reader::SlideSource;

/// Fill colour for tiles that hold no data.
const EMPTY_TILE_PIXEL: Rgb<u8> = Rgb([255, 255, 255]);

/// A TIFF pyramid opened over a [`RangeReader`].
///
/// Opening parses the IFD chain and loads every level's tile table; pixel
/// data is only fetched by [`SlideSource::read_level`].
pub struct TiffSlide<R: RangeReader> {
    reader: R,
    pyramid: TiffPyramid,
    tiles: Vec<TileData>,
    format: SlideFormat,
    info: SlideInfo,
    levels: Vec<LevelDescriptor>,
}

impl TiffSlide<FileRangeReader> {
    /// Open a slide file from disk.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let reader = FileRangeReader::open(path).await?;
        Self::open(reader, path).await
    }
}

impl<R: RangeReader> TiffSlide<R> {
    /// Open a slide; `path` only provides the slide identity.
    pub async fn open(reader: R, path: &Path) -> Result<Self, FormatError> {
        let header_len = (reader.size() as usize).min(TIFF_HEADER_SIZE);
        let header = reader.read_exact_at(0, header_len).await?;
        if !crate::format::is_tiff_header(&header) {
            return Err(FormatError::UnsupportedFormat {
                reason: format!("{} is not a TIFF or BigTIFF file", reader.identifier()),
            });
        }

        let pyramid = TiffPyramid::parse(&reader).await?;
        let format = detect_format(&header, pyramid.description.as_deref())?;

        let mut tiles = Vec::with_capacity(pyramid.level_count());
        for level in &pyramid.levels {
            level.validate_decodable()?;
            tiles.push(TileData::load(&reader, level, &pyramid.header).await?);
        }

        let dims: Vec<(u32, u32)> = pyramid.levels.iter().map(|l| (l.width, l.height)).collect();
        let levels = LevelDescriptor::from_dimensions(&dims);

        let mut info = SlideInfo::new(path, format.backend_name(), &levels);
        if format == SlideFormat::AperioSvs {
            if let Some(description) = pyramid.description.as_deref() {
                let metadata = SvsMetadata::parse(description);
                info.mpp = metadata.mpp;
                info.magnification = metadata.magnification;
            }
        }

        info!(
            slide = %reader.identifier(),
            format = format.name(),
            levels = levels.len(),
            width = info.dimensions.width,
            height = info.dimensions.height,
            "Opened slide"
        );

        Ok(Self {
            reader,
            pyramid,
            tiles,
            format,
            info,
            levels,
        })
    }

    pub fn format(&self) -> SlideFormat {
        self.format
    }

    /// Thumbnail, label and macro images found next to the pyramid.
    pub fn associated_images(&self) -> &[AssociatedImage] {
        &self.pyramid.associated
    }

    /// Fetch the raw bytes of every non-empty tile of a level.
    async fn fetch_tiles(
        &self,
        level: &PyramidLevel,
        tiles: &TileData,
    ) -> Result<Vec<(u32, u32, Bytes)>, SlideError> {
        let mut raw = Vec::with_capacity(level.tile_count() as usize);
        for tile_y in 0..level.tiles_y {
            for tile_x in 0..level.tiles_x {
                let Some((offset, size)) = level
                    .tile_index(tile_x, tile_y)
                    .and_then(|i| tiles.tile_location(i))
                else {
                    continue;
                };
                if size == 0 {
                    continue;
                }
                let bytes = self.reader.read_exact_at(offset, size as usize).await?;
                raw.push((tile_x, tile_y, bytes));
            }
        }
        Ok(raw)
    }
}

#[async_trait]
impl<R: RangeReader> SlideSource for TiffSlide<R> {
    fn info(&self) -> &SlideInfo {
        &self.info
    }

    fn levels(&self) -> &[LevelDescriptor] {
        &self.levels
    }

    async fn read_level(&self, index: usize) -> Result<RgbImage, SlideError> {
        let (level, tiles) = self
            .pyramid
            .get_level(index)
            .zip(self.tiles.get(index))
            .ok_or(SlideError::LevelOutOfRange {
                level: index,
                count: self.levels.len(),
            })?;

        let raw = self.fetch_tiles(level, tiles).await?;
        debug!(level = index, tiles = raw.len(), "Decoding level");

        let jpeg_tables = tiles.jpeg_tables.as_deref();
        let decoded = raw
            .par_iter()
            .map(|(tile_x, tile_y, bytes)| {
                decode_tile(level, jpeg_tables, bytes)
                    .map(|pixels| (*tile_x, *tile_y, pixels))
                    .map_err(|message| SlideError::TileDecode {
                        level: index,
                        tile_x: *tile_x,
                        tile_y: *tile_y,
                        message,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut canvas = RgbImage::from_pixel(level.width, level.height, EMPTY_TILE_PIXEL);
        for (tile_x, tile_y, pixels) in &decoded {
            // Edge tiles are padded to the full tile size; replace() clips them
            imageops::replace(
                &mut canvas,
                pixels,
                (*tile_x * level.tile_width) as i64,
                (*tile_y * level.tile_height) as i64,
            );
        }

        Ok(canvas)
    }
}

/// Decode one tile's bytes into RGB pixels.
fn decode_tile(level: &PyramidLevel, tables: Option<&[u8]>, data: &[u8]) -> Result<RgbImage, String> {
    match level.compression {
        Compression::Jpeg => decode_jpeg(&prepare_tile_jpeg(tables, data)),
        Compression::None => decode_uncompressed(level, data),
        other => Err(format!("unsupported compression {}", other.name())),
    }
}

fn decode_uncompressed(level: &PyramidLevel, data: &[u8]) -> Result<RgbImage, String> {
    let (w, h) = (level.tile_width, level.tile_height);
    let samples = level.samples_per_pixel as usize;
    let expected = w as usize * h as usize * samples;
    if data.len() < expected {
        return Err(format!(
            "expected {} bytes of uncompressed data, got {}",
            expected,
            data.len()
        ));
    }
    let data = data[..expected].to_vec();

    let image = match samples {
        1 => GrayImage::from_raw(w, h, data).map(|g| image::DynamicImage::ImageLuma8(g).to_rgb8()),
        3 => RgbImage::from_raw(w, h, data),
        4 => RgbaImage::from_raw(w, h, data).map(|rgba| image::DynamicImage::ImageRgba8(rgba).to_rgb8()),
        n => return Err(format!("{} samples per pixel", n)),
    };
    image.ok_or_else(|| "tile buffer size mismatch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tiff::Ifd;

    fn uncompressed_level(samples: u16) -> PyramidLevel {
        PyramidLevel {
            level_index: 0,
            ifd_index: 0,
            width: 3,
            height: 2,
            tile_width: 2,
            tile_height: 2,
            tiles_x: 2,
            tiles_y: 1,
            downsample_h: 1.0,
            downsample_w: 1.0,
            compression: Compression::None,
            samples_per_pixel: samples,
            planar_configuration: 1,
            ifd: Ifd {
                entries: Vec::new(),
                next_ifd_offset: 0,
            },
        }
    }

    #[test]
    fn test_decode_uncompressed_rgb() {
        let level = uncompressed_level(3);
        let data: Vec<u8> = (0..12).collect();

        let tile = decode_tile(&level, None, &data).unwrap();
        assert_eq!(tile.dimensions(), (2, 2));
        assert_eq!(tile.get_pixel(1, 0), &Rgb([3, 4, 5]));
    }

    #[test]
    fn test_decode_uncompressed_gray_and_rgba() {
        let gray = decode_tile(&uncompressed_level(1), None, &[7, 8, 9, 10]).unwrap();
        assert_eq!(gray.get_pixel(1, 1), &Rgb([10, 10, 10]));

        let rgba_data: Vec<u8> = vec![1, 2, 3, 255, 4, 5, 6, 255, 7, 8, 9, 255, 10, 11, 12, 255];
        let rgb = decode_tile(&uncompressed_level(4), None, &rgba_data).unwrap();
        assert_eq!(rgb.get_pixel(0, 1), &Rgb([7, 8, 9]));
    }

    #[test]
    fn test_decode_uncompressed_short_buffer() {
        let result = decode_tile(&uncompressed_level(3), None, &[0u8; 5]);
        assert!(result.is_err());
    }
}

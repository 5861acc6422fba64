//! Slide reading tests against synthetic pyramid TIFFs.

use image::{Rgb, RgbImage};
use wsi_tissue_mask::error::{FormatError, TiffError};
use wsi_tissue_mask::format::SlideFormat;
use wsi_tissue_mask::io::MemoryRangeReader;
use wsi_tissue_mask::output::FileEmitter;
use wsi_tissue_mask::pipeline::export_associated;
use wsi_tissue_mask::slide::{SlideSource, TiffSlide};

use super::test_utils::*;

async fn open(data: Vec<u8>, name: &str) -> Result<TiffSlide<MemoryRangeReader>, FormatError> {
    let reader = MemoryRangeReader::new(data, name);
    TiffSlide::open(reader, std::path::Path::new(name)).await
}

fn max_channel_diff(a: &RgbImage, b: &RgbImage) -> u8 {
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(p, q)| (0..3).map(move |c| p[c].abs_diff(q[c])))
        .max()
        .unwrap_or(0)
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_generic_tiff_catalog() {
    let data = PyramidTiffBuilder::new(tissue_pyramid(64, 48, 3)).build();
    let slide = open(data, "/slides/sample.tiff").await.unwrap();

    assert_eq!(slide.format(), SlideFormat::GenericTiff);
    assert_eq!(slide.level_count(), 3);

    let dims: Vec<(u32, u32)> = slide.levels().iter().map(|l| l.dimensions()).collect();
    assert_eq!(dims, vec![(64, 48), (32, 24), (16, 12)]);
    assert_eq!(slide.levels()[2].downsample_w, 4.0);
    assert_eq!(slide.levels()[2].downsample_h, 4.0);

    let info = slide.info();
    assert_eq!(info.name, "sample");
    assert_eq!(info.suffix, ".tiff");
    assert_eq!(info.backend_name, "tiff");
    assert_eq!(info.level_count, 3);
    assert_eq!(info.data_bounds, [0, 0, 64, 48]);
}

#[tokio::test]
async fn test_svs_detection_and_metadata() {
    let data = PyramidTiffBuilder::new(tissue_pyramid(64, 48, 2))
        .description(APERIO_DESCRIPTION)
        .build();
    let slide = open(data, "/slides/case.svs").await.unwrap();

    assert_eq!(slide.format(), SlideFormat::AperioSvs);
    assert_eq!(slide.info().backend_name, "svs");
    assert_eq!(slide.info().mpp, Some(0.499));
    assert_eq!(slide.info().magnification, Some(20.0));
}

#[tokio::test]
async fn test_label_image_not_a_level() {
    let mut levels = tissue_pyramid(64, 48, 2);
    // Square label with an aspect ratio unrelated to the slide
    levels.push(RgbImage::from_pixel(20, 20, Rgb([0, 0, 0])));

    let data = PyramidTiffBuilder::new(levels).build();
    let slide = open(data, "/slides/labelled.tiff").await.unwrap();

    assert_eq!(slide.level_count(), 2);

    let associated = slide.associated_images();
    assert_eq!(associated.len(), 1);
    assert_eq!(associated[0].name, "image2");
    assert_eq!((associated[0].width, associated[0].height), (20, 20));
}

#[tokio::test]
async fn test_export_associated_label() {
    let dir = tempfile::tempdir().unwrap();
    let mut levels = tissue_pyramid(64, 48, 2);
    let label = RgbImage::from_fn(32, 32, |x, y| Rgb([x as u8 * 8, y as u8 * 8, 200]));
    levels.push(label.clone());

    let data = PyramidTiffBuilder::new(levels)
        .description(APERIO_DESCRIPTION)
        .page_description(2, "Aperio Image Library v12.0.15\r\nlabel 32x32")
        .build();
    let path = write_slide(dir.path(), "case.svs", &data);
    let slide = TiffSlide::open_path(&path).await.unwrap();

    let names: Vec<&str> = slide.associated_images().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["label"]);

    let out = dir.path().join("extras");
    let report = export_associated(&path, slide.associated_images(), &out, &FileEmitter::new());
    assert!(report.is_success());
    assert_eq!(report.written, vec![out.join("case_associated_label.png")]);

    let exported = image::open(out.join("case_associated_label.png")).unwrap().to_rgb8();
    assert_eq!(exported, label);
}

#[tokio::test]
async fn test_big_endian_and_bigtiff() {
    for (order, big) in [
        (ByteOrderType::BigEndian, false),
        (ByteOrderType::LittleEndian, true),
        (ByteOrderType::BigEndian, true),
    ] {
        let levels = tissue_pyramid(40, 40, 2);
        let data = PyramidTiffBuilder::new(levels.clone())
            .byte_order(order)
            .bigtiff(big)
            .build();
        let slide = open(data, "/slides/variant.tiff").await.unwrap();

        assert_eq!(slide.level_count(), 2, "order {:?}, bigtiff {}", order, big);
        assert_eq!(slide.read_level(1).await.unwrap(), levels[1]);
    }
}

// =============================================================================
// Pixel Reads
// =============================================================================

#[tokio::test]
async fn test_read_uncompressed_level_exact() {
    // 40x30 with 16px tiles leaves partial edge tiles on both axes
    let level = RgbImage::from_fn(40, 30, |x, y| Rgb([x as u8, y as u8, (x + y) as u8]));
    let data = PyramidTiffBuilder::new(vec![level.clone()]).build();
    let slide = open(data, "/slides/edges.tiff").await.unwrap();

    let pixels = slide.read_level(0).await.unwrap();
    assert_eq!(pixels.dimensions(), (40, 30));
    assert_eq!(pixels, level);
}

#[tokio::test]
async fn test_read_jpeg_level() {
    let levels = tissue_pyramid(64, 32, 2);
    let data = PyramidTiffBuilder::new(levels.clone())
        .encoding(TileEncoding::Jpeg)
        .description(APERIO_DESCRIPTION)
        .build();
    let slide = open(data, "/slides/jpeg.svs").await.unwrap();

    let pixels = slide.read_level(0).await.unwrap();
    assert_eq!(pixels.dimensions(), (64, 32));
    assert!(max_channel_diff(&pixels, &levels[0]) < 24);
}

#[tokio::test]
async fn test_read_level_out_of_range() {
    let data = PyramidTiffBuilder::new(tissue_pyramid(32, 32, 1)).build();
    let slide = open(data, "/slides/one.tiff").await.unwrap();

    assert!(slide.read_level(1).await.is_err());
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_not_a_tiff() {
    let result = open(b"PK\x03\x04 not a tiff at all".to_vec(), "/slides/zip.svs").await;
    assert!(matches!(result, Err(FormatError::UnsupportedFormat { .. })));
}

#[tokio::test]
async fn test_unsupported_compression_rejected_at_open() {
    // LZW-tagged tiles
    let data = PyramidTiffBuilder::new(tissue_pyramid(32, 32, 1))
        .compression_tag(5)
        .build();
    let result = open(data, "/slides/lzw.tiff").await;

    assert!(matches!(
        result,
        Err(FormatError::Tiff(TiffError::UnsupportedCompression(_)))
    ));
}

#[tokio::test]
async fn test_strip_only_tiff_has_no_levels() {
    // Header plus an IFD without tile tags
    let mut data = b"II*\x00\x08\x00\x00\x00".to_vec();
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&256u16.to_le_bytes());
    data.extend_from_slice(&4u16.to_le_bytes());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&100u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());

    let result = open(data, "/slides/strips.tiff").await;
    assert!(matches!(
        result,
        Err(FormatError::Tiff(TiffError::NoPyramidLevels))
    ));
}

//! End-to-end masking runs: slide file in, masked levels and metadata out.

use std::path::Path;

use image::Rgb;
use serde_json::Value;
use wsi_tissue_mask::batch::{run_batch, BatchSettings};
use wsi_tissue_mask::error::{ConfigError, PipelineError};
use wsi_tissue_mask::mask::BACKGROUND_PIXEL;
use wsi_tissue_mask::pipeline::{
    LevelSelection, OutputCompression, OutputMode, ProcessingParams, RunRequest, SlideJob,
};

use super::test_utils::*;

fn write_pyramid_slide(dir: &Path, name: &str) -> std::path::PathBuf {
    let data = PyramidTiffBuilder::new(tissue_pyramid(64, 48, 3))
        .description(APERIO_DESCRIPTION)
        .build();
    write_slide(dir, name, &data)
}

fn job(input: &Path, output: &Path, params: ProcessingParams, levels: LevelSelection) -> SlideJob {
    SlideJob {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        params,
        request: RunRequest {
            levels,
            mask_level: None,
            save_mask: false,
        },
        dry_run: false,
    }
}

fn read_metadata(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// Per-Level Mode
// =============================================================================

#[tokio::test]
async fn test_per_level_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pyramid_slide(dir.path(), "case.svs");
    let output = dir.path().join("out/case.tiff");

    let mut job = job(&input, &output, ProcessingParams::default(), LevelSelection::All);
    job.request.save_mask = true;
    let summary = job.run().await.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.succeeded_levels(), vec![0, 1, 2]);

    let out = dir.path().join("out");
    for name in [
        "case.tiff",
        "case_level1.tiff",
        "case_level2.tiff",
        "case_mask.png",
        "case_metadata.json",
    ] {
        assert!(out.join(name).is_file(), "missing {}", name);
    }

    // Mask computed on level 0 (within the size limit), left half tissue
    let level0 = &read_tiff_pages(&out.join("case.tiff"))[0];
    assert_eq!(level0.dimensions(), (64, 48));
    assert_eq!(level0.get_pixel(5, 5), &TISSUE_PIXEL);
    assert_eq!(level0.get_pixel(60, 5), &Rgb(BACKGROUND_PIXEL));

    let level2 = &read_tiff_pages(&out.join("case_level2.tiff"))[0];
    assert_eq!(level2.dimensions(), (16, 12));

    let mask = image::open(out.join("case_mask.png")).unwrap().to_luma8();
    assert_eq!(mask.dimensions(), (64, 48));
    assert_eq!(mask.get_pixel(5, 5)[0], 0);
    assert_eq!(mask.get_pixel(60, 5)[0], 255);
}

#[tokio::test]
async fn test_metadata_contents() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pyramid_slide(dir.path(), "case.svs");
    let output = dir.path().join("case_out.tiff");

    let params = ProcessingParams {
        clean_mask: true,
        min_area_pixels: 4,
        compression: OutputCompression::Deflate,
        ..Default::default()
    };
    job(&input, &output, params, LevelSelection::Explicit(vec![2, 0]))
        .run()
        .await
        .unwrap();

    let meta = read_metadata(&dir.path().join("case_out_metadata.json"));

    assert_eq!(meta["slide_info"]["name"], "case");
    assert_eq!(meta["slide_info"]["suffix"], ".svs");
    assert_eq!(meta["slide_info"]["backend_name"], "svs");
    assert_eq!(meta["slide_info"]["level_count"], 3);
    assert_eq!(meta["slide_info"]["dimensions"]["width"], 64);

    let params = &meta["processing_params"];
    assert_eq!(params["compression"], "zlib");
    assert_eq!(params["clean_mask"], true);
    assert_eq!(params["min_area"], 4);
    assert_eq!(params["mask_level"], 0);
    assert_eq!(params["processed_levels"], serde_json::json!([2, 0]));
    assert_eq!(params["pyramid_mode"], false);
    assert!(params["timestamp"].is_string());

    let levels = meta["levels"].as_object().unwrap();
    let keys: Vec<&String> = levels.keys().collect();
    assert_eq!(keys.len(), 2);

    let level2 = &meta["levels"]["2"];
    assert_eq!(level2["dimensions"]["width"], 16);
    assert_eq!(level2["downsample_factor"]["width"], 4.0);
    let pct = level2["tissue_percentage"].as_f64().unwrap();
    assert!((pct - 50.0).abs() < 10.0, "tissue percentage {}", pct);
    assert!(level2["output_path"]
        .as_str()
        .unwrap()
        .ends_with("case_out_level2.tiff"));
    assert!(meta.get("output").is_none());
}

#[tokio::test]
async fn test_png_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pyramid_slide(dir.path(), "case.svs");
    let output = dir.path().join("case.png");

    job(&input, &output, ProcessingParams::default(), LevelSelection::UpTo(1))
        .run()
        .await
        .unwrap();

    let level1 = image::open(dir.path().join("case_level1.png")).unwrap().to_rgb8();
    assert_eq!(level1.dimensions(), (32, 24));
    assert!(!dir.path().join("case_level2.png").exists());
}

#[tokio::test]
async fn test_unknown_level_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pyramid_slide(dir.path(), "case.svs");
    let out = dir.path().join("out");

    let result = job(
        &input,
        &out.join("case.tiff"),
        ProcessingParams::default(),
        LevelSelection::Explicit(vec![0, 7]),
    )
    .run()
    .await;

    assert!(matches!(
        result,
        Err(PipelineError::Config(ConfigError::UnknownLevels { .. }))
    ));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pyramid_slide(dir.path(), "case.svs");
    let out = dir.path().join("out");

    let mut job = job(&input, &out.join("case.tiff"), ProcessingParams::default(), LevelSelection::All);
    job.dry_run = true;
    job.request.save_mask = true;
    let summary = job.run().await.unwrap();

    assert_eq!(summary.record.levels.len(), 3);
    assert!(!out.exists());
}

// =============================================================================
// Pyramid Mode
// =============================================================================

#[tokio::test]
async fn test_pyramid_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pyramid_slide(dir.path(), "case.svs");
    let output = dir.path().join("case_masked.png");

    let params = ProcessingParams {
        output_mode: OutputMode::SinglePyramid,
        ..Default::default()
    };
    let summary = job(&input, &output, params, LevelSelection::Explicit(vec![2, 0, 1]))
        .run()
        .await
        .unwrap();

    let tiff_path = dir.path().join("case_masked.tiff");
    let pages = read_tiff_pages(&tiff_path);
    let dims: Vec<(u32, u32)> = pages.iter().map(|p| p.dimensions()).collect();
    assert_eq!(dims, vec![(64, 48), (32, 24), (16, 12)]);

    let output = summary.record.output.as_ref().unwrap();
    assert!(output.is_pyramid);
    assert!(!output.fallback);

    let meta = read_metadata(&dir.path().join("case_masked_metadata.json"));
    assert_eq!(meta["output"]["is_pyramid"], true);
    assert_eq!(meta["processing_params"]["pyramid_mode"], true);
    assert_eq!(
        meta["levels"]["1"]["output_path"],
        meta["output"]["path"]
    );
    assert!(!dir.path().join("case_masked_level1.tiff").exists());
}

// =============================================================================
// Batch
// =============================================================================

#[tokio::test]
async fn test_batch_run() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("slides");
    std::fs::create_dir(&input_dir).unwrap();
    write_pyramid_slide(&input_dir, "a.svs");
    write_pyramid_slide(&input_dir, "b.SVS");
    write_slide(&input_dir, "broken.svs", b"not a slide");
    write_slide(&input_dir, "ignored.tiff", b"");

    let config = serde_json::json!({
        "input_dir": input_dir,
        "output_dir": dir.path().join("masked"),
        "max_level": 1,
        "save_mask": true,
    });
    let settings = BatchSettings::from_json(&config.to_string()).unwrap();

    let report = run_batch(&settings, false, false).await.unwrap();

    assert_eq!(report.succeeded.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("broken.svs"));

    let masked = dir.path().join("masked");
    assert!(masked.join("a.tiff").is_file());
    assert!(masked.join("a_level1.tiff").is_file());
    assert!(masked.join("a_mask.png").is_file());
    assert!(masked.join("b.tiff").is_file());
    assert!(!masked.join("a_level2.tiff").exists());

    // Second run refuses the now non-empty output directory
    assert!(run_batch(&settings, false, false).await.is_err());
    assert!(run_batch(&settings, true, false).await.is_ok());
}

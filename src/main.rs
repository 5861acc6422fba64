//! WSI Tissue Mask - background removal for Whole Slide Images.
//!
//! This binary parses the command line and dispatches to the library.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_tissue_mask::{
    batch::{run_batch, BatchSettings},
    config::{BatchConfig, Cli, Command, InspectConfig, MaskConfig},
    io::FileRangeReader,
    output::FileEmitter,
    pipeline::export_associated,
    slide::{SlideSource, TiffSlide},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Mask(config) => run_mask(config).await,
        Command::Batch(config) => run_batch_command(config).await,
        Command::Inspect(config) => run_inspect(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_tissue_mask=debug"
    } else {
        "wsi_tissue_mask=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Mask Command
// =============================================================================

async fn run_mask(config: MaskConfig) -> ExitCode {
    init_logging(config.verbose);

    let job = match config.validate() {
        Ok(job) => job,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if job.dry_run {
        info!("Dry run: no files will be written");
    }

    let summary = match job.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let record = &summary.record;
    info!(
        "Threshold {} (mask level {}), {} level(s) processed",
        record.processing_params.threshold,
        record.processing_params.mask_level,
        record.levels.len()
    );
    for level in record.levels.iter() {
        match (level.tissue_percentage, &level.output_path) {
            (Some(pct), Some(path)) => info!("  Level {}: {:.2}% tissue -> {}", level.level, pct, path),
            (Some(pct), None) => info!("  Level {}: {:.2}% tissue (not written)", level.level, pct),
            (None, _) => warn!("  Level {}: not processed", level.level),
        }
    }
    if let Some(output) = &record.output {
        if output.fallback {
            warn!("Wrote only the highest-resolution level to {}", output.path);
        }
    }

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        for (level, message) in &summary.failed_levels {
            error!("Level {} failed: {}", level, message);
        }
        ExitCode::FAILURE
    }
}

// =============================================================================
// Batch Command
// =============================================================================

async fn run_batch_command(config: BatchConfig) -> ExitCode {
    init_logging(config.verbose);

    let settings = match BatchSettings::load(&config.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = match run_batch(&settings, config.force, config.dry_run).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Processed {} slide(s): {} succeeded, {} failed",
        report.succeeded.len() + report.failed.len(),
        report.succeeded.len(),
        report.failed.len()
    );
    for (slide, message) in &report.failed {
        error!("  {}: {}", slide.display(), message);
    }

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if config.verbose || config.export_associated.is_some() {
        init_logging(config.verbose);
    }

    let slide = match TiffSlide::open_path(&config.input).await {
        Ok(slide) => slide,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let info = slide.info();

    if config.json {
        let json = serde_json::json!({
            "slide_info": info,
            "format": slide.format().name(),
            "mpp": info.mpp,
            "magnification": info.magnification,
            "levels": slide.levels(),
            "associated_images": slide.associated_images(),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_slide_summary(&slide);
    }

    let Some(dir) = &config.export_associated else {
        return ExitCode::SUCCESS;
    };
    let report = export_associated(
        &config.input,
        slide.associated_images(),
        dir,
        &FileEmitter::new(),
    );
    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Associated image export complete"
    );
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_slide_summary(slide: &TiffSlide<FileRangeReader>) {
    let info = slide.info();

    println!("Slide: {}", info.path);
    println!("  Format:     {}", slide.format().name());
    println!(
        "  Dimensions: {} x {}",
        info.dimensions.width, info.dimensions.height
    );
    if let Some(mpp) = info.mpp {
        println!("  MPP:        {}", mpp);
    }
    if let Some(mag) = info.magnification {
        println!("  Objective:  {}x", mag);
    }
    println!();
    println!("Levels:");
    for level in slide.levels() {
        println!(
            "  {:>2}: {:>6} x {:<6}  downsample {:.2}",
            level.index, level.width, level.height, level.downsample_w
        );
    }

    let associated = slide.associated_images();
    if !associated.is_empty() {
        println!();
        println!("Associated images:");
        for image in associated {
            println!("  {:<10} {:>6} x {}", image.name, image.width, image.height);
        }
    }
}

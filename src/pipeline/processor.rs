//! Level processing.
//!
//! A run builds the canonical mask once, then walks the requested levels in
//! request order:
//!
//! ```text
//! read mask level ─► generate ─► clean? ─┐
//!                                        ▼
//! for each level: read ─► scale mask ─► apply ─► Emitter
//! ```
//!
//! All file output goes through an [`Emitter`]; a dry run passes a
//! [`DryRunEmitter`](crate::output::DryRunEmitter) and the computed record is
//! identical.

use image::RgbImage;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigError, PipelineError};
use crate::mask::{self, BinaryMask, GeneratedMask, MaskedLevel};
use crate::output::{Emitter, OutputLayout};
use crate::slide::{select_mask_level, LevelDescriptor, SlideSource, DEFAULT_MASK_MAX_DIMENSION};

use super::params::{LevelSelection, ProcessingParams};
use super::plan::PyramidPlan;
use super::record::{LevelResult, LevelResults, OutputRecord, ProcessingRecord, RunRecord, RunSummary};

/// What to process in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub levels: LevelSelection,

    /// Level the mask is computed on; chosen automatically when `None`
    pub mask_level: Option<usize>,

    /// Also export the canonical mask as a PNG
    pub save_mask: bool,
}

/// Runs the masking pipeline over one slide.
pub struct LevelProcessor<'a, S: SlideSource + ?Sized> {
    slide: &'a S,
    params: ProcessingParams,
    layout: OutputLayout,
}

impl<'a, S: SlideSource + ?Sized> LevelProcessor<'a, S> {
    pub fn new(slide: &'a S, params: ProcessingParams, layout: OutputLayout) -> Self {
        Self {
            slide,
            params,
            layout,
        }
    }

    pub fn params(&self) -> &ProcessingParams {
        &self.params
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Resolve the level selection against the slide's catalog.
    pub fn validate_levels(&self, selection: &LevelSelection) -> Result<Vec<usize>, ConfigError> {
        selection.resolve(self.slide.level_count())
    }

    /// Mask level: the override if given, otherwise the finest level that
    /// fits within [`DEFAULT_MASK_MAX_DIMENSION`].
    pub fn mask_level(&self, requested: Option<usize>) -> Result<usize, ConfigError> {
        let count = self.slide.level_count();
        if count == 0 {
            return Err(ConfigError::NoLevels);
        }

        let level = requested
            .unwrap_or_else(|| select_mask_level(self.slide.levels(), DEFAULT_MASK_MAX_DIMENSION));
        if level >= count {
            return Err(ConfigError::UnknownLevels {
                invalid: vec![level],
                available: count,
            });
        }
        Ok(level)
    }

    /// Read the mask level and compute the canonical mask.
    pub async fn build_mask(&self, level: usize) -> Result<GeneratedMask, PipelineError> {
        let pixels = self.slide.read_level(level).await?;
        let mut generated = mask::generate(&pixels, &self.params.threshold_params());

        debug!(
            level = level,
            threshold = generated.threshold,
            tissue_pixels = generated.mask.tissue_count(),
            "Generated mask"
        );

        if self.params.clean_mask {
            generated.mask = mask::clean(&generated.mask, self.params.min_area_pixels);
            debug!(
                min_area = self.params.min_area_pixels,
                tissue_pixels = generated.mask.tissue_count(),
                "Cleaned mask"
            );
        }

        Ok(generated)
    }

    /// Read one level and apply the canonical mask to it.
    pub async fn process_level(
        &self,
        level: usize,
        canonical: &BinaryMask,
    ) -> Result<MaskedLevel, PipelineError> {
        let pixels = self.slide.read_level(level).await?;

        let masked = if pixels.dimensions() == canonical.dimensions() {
            mask::apply(&pixels, canonical)?
        } else {
            let scaled = mask::scale(canonical, pixels.width(), pixels.height());
            mask::apply(&pixels, &scaled)?
        };

        debug!(
            level = level,
            tissue_percentage = masked.tissue_percentage,
            "Processed level"
        );
        Ok(masked)
    }

    /// Run the whole pipeline and hand every output to `emitter`.
    ///
    /// Configuration problems and mask failures abort before anything is
    /// written. In per-level mode a failing level is reported in
    /// [`RunSummary::failed_levels`] and the run continues; in pyramid mode
    /// any failure aborts. Metadata is written last.
    pub async fn run<E: Emitter + ?Sized>(
        &self,
        request: &RunRequest,
        emitter: &E,
    ) -> Result<RunSummary, PipelineError> {
        let levels = self.validate_levels(&request.levels)?;
        let mask_level = self.mask_level(request.mask_level)?;
        let descriptors = levels
            .iter()
            .map(|&level| self.descriptor(level))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            slide = %self.slide.info().name,
            levels = ?levels,
            mask_level = mask_level,
            pyramid = self.params.is_pyramid(),
            "Processing slide"
        );

        let generated = self.build_mask(mask_level).await?;

        if request.save_mask {
            emitter.write_mask(&self.layout.mask_path(), &generated.mask)?;
        }

        let (results, failed_levels, output) = if self.params.is_pyramid() {
            let (results, output) = self.run_pyramid(&descriptors, &generated.mask, emitter).await?;
            (results, Vec::new(), Some(output))
        } else {
            let (results, failed) = self.run_per_level(&descriptors, &generated.mask, emitter).await;
            (results, failed, None)
        };

        let record = RunRecord {
            slide_info: self.slide.info().clone(),
            processing_params: ProcessingRecord::new(
                &self.params,
                generated.threshold,
                mask_level,
                levels,
            ),
            levels: results,
            output,
        };
        emitter.write_metadata(&self.layout.metadata_path(), &record)?;

        let summary = RunSummary {
            record,
            failed_levels,
        };
        info!(
            succeeded = summary.succeeded_levels().len(),
            failed = summary.failed_levels.len(),
            "Finished slide"
        );
        Ok(summary)
    }

    fn descriptor(&self, level: usize) -> Result<LevelDescriptor, ConfigError> {
        self.slide
            .level_descriptor(level)
            .ok_or_else(|| ConfigError::UnknownLevels {
                invalid: vec![level],
                available: self.slide.level_count(),
            })
    }

    async fn run_per_level<E: Emitter + ?Sized>(
        &self,
        descriptors: &[LevelDescriptor],
        canonical: &BinaryMask,
        emitter: &E,
    ) -> (LevelResults, Vec<(usize, String)>) {
        let mut results = Vec::with_capacity(descriptors.len());
        let mut failed = Vec::new();

        for descriptor in descriptors {
            let level = descriptor.index;
            let mut result = LevelResult::new(descriptor);

            let outcome = match self.process_level(level, canonical).await {
                Ok(masked) => {
                    result.tissue_percentage = Some(masked.tissue_percentage);
                    let path = self.layout.level_path(level);
                    emitter
                        .write_level(&path, &masked.image, self.params.compression)
                        .map(|()| path)
                        .map_err(PipelineError::from)
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(path) => result.output_path = Some(path.display().to_string()),
                Err(e) => {
                    error!(level = level, error = %e, "Level failed");
                    failed.push((level, e.to_string()));
                }
            }
            results.push(result);
        }

        (LevelResults(results), failed)
    }

    async fn run_pyramid<E: Emitter + ?Sized>(
        &self,
        descriptors: &[LevelDescriptor],
        canonical: &BinaryMask,
        emitter: &E,
    ) -> Result<(LevelResults, OutputRecord), PipelineError> {
        let mut results = Vec::with_capacity(descriptors.len());
        let mut processed: Vec<(usize, RgbImage)> = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let masked = self.process_level(descriptor.index, canonical).await?;
            let mut result = LevelResult::new(descriptor);
            result.tissue_percentage = Some(masked.tissue_percentage);
            results.push(result);
            processed.push((descriptor.index, masked.image));
        }
        processed.sort_by_key(|(level, _)| *level);

        let path = self.layout.output_path();
        let compression = self.params.compression;
        let plan = PyramidPlan::choose(processed.len(), emitter.supports_pyramid());

        let written: Vec<usize> = match plan {
            PyramidPlan::MultiPage => {
                let pages: Vec<&RgbImage> = processed.iter().map(|(_, image)| image).collect();
                emitter.write_pyramid(path, &pages, compression)?;
                processed.iter().map(|(level, _)| *level).collect()
            }
            PyramidPlan::Single | PyramidPlan::Fallback => {
                let (level, image) = processed.first().ok_or(ConfigError::NoLevels)?;
                if plan == PyramidPlan::Fallback {
                    warn!(
                        level = *level,
                        dropped = processed.len() - 1,
                        "Writer cannot store multiple pages; keeping only the highest-resolution level"
                    );
                }
                emitter.write_level(path, image, compression)?;
                vec![*level]
            }
        };

        let path_str = path.display().to_string();
        for result in results.iter_mut().filter(|r| written.contains(&r.level)) {
            result.output_path = Some(path_str.clone());
        }

        let output = OutputRecord {
            path: path_str,
            is_pyramid: plan == PyramidPlan::MultiPage,
            fallback: plan == PyramidPlan::Fallback,
        };
        Ok((LevelResults(results), output))
    }
}

use std::path::PathBuf;

use tracing::info;

use crate::error::{ConfigError, PipelineError};
use crate::output::{DryRunEmitter, FileEmitter, OutputLayout};
use crate::slide::{SlideSource, TiffSlide};

use super::params::ProcessingParams;
use super::processor::{LevelProcessor, RunRequest};
use super::record::RunSummary;

/// One slide to mask, fully validated.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub params: ProcessingParams,
    pub request: RunRequest,

    /// Compute everything but write nothing
    pub dry_run: bool,
}

impl SlideJob {
    /// Open the input slide, process it and write the outputs.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        if !self.input.is_file() {
            return Err(ConfigError::InputNotFound(self.input.clone()).into());
        }

        let slide = TiffSlide::open_path(&self.input).await?;
        info!(
            slide = %self.input.display(),
            format = slide.format().name(),
            levels = slide.level_count(),
            "Opened slide"
        );

        let layout = OutputLayout::new(&self.output, self.params.output_mode);
        let processor = LevelProcessor::new(&slide, self.params.clone(), layout);

        if self.dry_run {
            processor.run(&self.request, &DryRunEmitter).await
        } else {
            processor.run(&self.request, &FileEmitter::new()).await
        }
    }
}

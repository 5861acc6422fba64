//! Masking pipeline: parameters, level processing and run records.

mod associated;
mod job;
mod params;
mod plan;
mod processor;
mod record;

pub use associated::{export_associated, AssociatedExport};
pub use job::SlideJob;
pub use params::{LevelSelection, OutputCompression, OutputMode, ProcessingParams};
pub use plan::PyramidPlan;
pub use processor::{LevelProcessor, RunRequest};
pub use record::{
    DownsampleFactor, LevelResult, LevelResults, OutputRecord, ProcessingRecord, RunRecord,
    RunSummary,
};

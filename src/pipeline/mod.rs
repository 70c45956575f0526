//! Classification pipelines: preprocessing, model, calibration and results.

mod orchestrator;
mod profile;
mod registry;
mod result;

pub use orchestrator::{ClassifyOverrides, Pipeline, PipelineConfig};
pub use profile::{PipelineMode, PipelineProfile};
pub use registry::PipelineSet;
pub use result::{
    ClassificationResult, GenusDetection, PipelineInfo, PipelineStatus, PredictionRecord,
    RankedClassification,
};

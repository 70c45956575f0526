//! Plain-text rendering for human output mode.

use super::reporter::BatchSummary;
use crate::error::Error;
use crate::output::json_envelope::suggestion_for;
use crate::pipeline::{ClassificationResult, PipelineInfo};
use std::fmt::Write as _;
use std::path::Path;

/// Render one image result.
pub fn format_result(file: &Path, result: &ClassificationResult) -> String {
    let mut out = format!("{}\n", file.display());

    match result {
        ClassificationResult::Ranked(ranked) => {
            for (rank, p) in ranked.all_predictions.iter().enumerate() {
                let marker = if p.is_confident { "" } else { "  (below threshold)" };
                let _ = writeln!(
                    out,
                    "  {}. {:<24} {:>7}  threshold {:.2}{marker}",
                    rank + 1,
                    p.genus,
                    p.confidence_percent,
                    p.threshold
                );
            }
            let _ = writeln!(out, "  model: {}", ranked.model_type);
        }
        ClassificationResult::Detection(detection) => {
            let _ = writeln!(out, "  {}", detection.message);
        }
    }

    out
}

/// Render a per-image failure.
pub fn format_image_error(file: &Path, error: &Error) -> String {
    let mut out = format!("{}\n  error: {error}\n", file.display());
    if let Some(hint) = suggestion_for(error) {
        let _ = writeln!(out, "  hint: {hint}");
    }
    out
}

/// Render the batch summary line.
pub fn format_summary(summary: &BatchSummary) -> String {
    #[allow(clippy::cast_precision_loss)]
    let secs = summary.duration_ms as f64 / 1000.0;
    format!(
        "\n{} image(s) classified, {} failed in {secs:.2}s\n",
        summary.processed, summary.failed
    )
}

/// Render pipeline descriptions.
pub fn format_pipeline_info(pipelines: &[PipelineInfo]) -> String {
    if pipelines.is_empty() {
        return "No pipelines configured.\nUse --models-dir or edit the config file (plantid config path).\n"
            .to_string();
    }

    let mut out = String::new();
    for info in pipelines {
        let _ = writeln!(out, "{} pipeline", info.name);
        let _ = writeln!(out, "  status:     {}", info.status);
        let _ = writeln!(out, "  model:      {}", info.model_path.display());
        let _ = writeln!(out, "  model type: {}", info.model_type);
        if let Some(n) = info.num_classes {
            let _ = writeln!(out, "  classes:    {n}");
        }
        if let Some(shape) = &info.input_shape {
            let _ = writeln!(out, "  input:      {shape:?}");
        }
        if let Some(shape) = &info.output_shape {
            let _ = writeln!(out, "  output:     {shape:?}");
        }
    }
    out
}

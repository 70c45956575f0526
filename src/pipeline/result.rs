//! Result types returned by pipelines.

use super::profile::PipelineMode;
use crate::constants::{confidence, messages};
use serde::Serialize;
use std::path::PathBuf;

/// One reported class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    /// Class name.
    pub genus: String,
    /// Calibrated probability.
    pub confidence: f32,
    /// `confidence` as a percentage string, e.g. `"88.08%"`.
    pub confidence_percent: String,
    /// Minimum confidence for this class.
    pub threshold: f32,
    /// `confidence >= threshold`.
    pub is_confident: bool,
}

impl PredictionRecord {
    /// Build a record, deriving the percentage string.
    pub fn new(
        genus: impl Into<String>,
        confidence: f32,
        threshold: f32,
        is_confident: bool,
    ) -> Self {
        Self {
            genus: genus.into(),
            confidence,
            confidence_percent: format!("{:.2}%", confidence * 100.0),
            threshold,
            is_confident,
        }
    }
}

/// Ranked output of the classification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedClassification {
    /// Best class. Always equal to `all_predictions[0]`.
    pub top_prediction: PredictionRecord,
    /// Reported classes, best first.
    pub all_predictions: Vec<PredictionRecord>,
    /// Model description.
    pub model_type: String,
}

/// Output of the genus detection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenusDetection {
    /// Detected genus, or `None` when nothing cleared the threshold.
    pub genus: Option<String>,
    /// Confidence rounded to four decimals.
    pub confidence: Option<f64>,
    /// Human-readable summary.
    pub message: String,
}

impl GenusDetection {
    /// A confident detection.
    pub fn detected(genus: impl Into<String>, confidence: f32) -> Self {
        let genus = genus.into();
        let message = format!(
            "Detected genus: {genus} with {:.2}% confidence",
            confidence * 100.0
        );
        Self {
            genus: Some(genus),
            confidence: Some(round_confidence(confidence)),
            message,
        }
    }

    /// Nothing cleared the threshold.
    pub fn none() -> Self {
        Self {
            genus: None,
            confidence: None,
            message: messages::NO_DETECTION.to_string(),
        }
    }
}

fn round_confidence(value: f32) -> f64 {
    let scale = 10f64.powi(confidence::DECIMAL_PLACES);
    (f64::from(value) * scale).round() / scale
}

/// Output of either pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClassificationResult {
    /// Classification pipeline output.
    Ranked(RankedClassification),
    /// Genus detection pipeline output.
    Detection(GenusDetection),
}

impl ClassificationResult {
    /// Name of the best class, if any.
    pub fn top_genus(&self) -> Option<&str> {
        match self {
            Self::Ranked(r) => Some(r.top_prediction.genus.as_str()),
            Self::Detection(d) => d.genus.as_deref(),
        }
    }
}

/// Lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// No successful initialization yet.
    NotInitialized,
    /// Initialization in progress.
    Initializing,
    /// Ready to classify.
    Ready,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotInitialized => "not initialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Description of a pipeline and, once ready, its model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineInfo {
    /// Pipeline name.
    pub name: String,
    /// Lifecycle state.
    pub status: PipelineStatus,
    /// Result shape.
    pub mode: PipelineMode,
    /// Model file.
    pub model_path: PathBuf,
    /// Model description.
    pub model_type: String,
    /// Number of classes in the label catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_classes: Option<usize>,
    /// Declared model input shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Vec<i64>>,
    /// Declared model output shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_shape: Option<Vec<i64>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_record_percent() {
        let record = PredictionRecord::new("Monstera", 0.880_797, 0.6, true);
        assert_eq!(record.confidence_percent, "88.08%");
    }

    #[test]
    fn test_detection_rounding_and_message() {
        let detection = GenusDetection::detected("Ficus", 0.912_345_6);
        assert_eq!(detection.genus.as_deref(), Some("Ficus"));
        assert!((detection.confidence.unwrap() - 0.9123).abs() < 1e-9);
        assert_eq!(
            detection.message,
            "Detected genus: Ficus with 91.23% confidence"
        );
    }

    #[test]
    fn test_no_detection_serializes_nulls() {
        let json = serde_json::to_value(ClassificationResult::Detection(GenusDetection::none()))
            .unwrap();
        assert!(json["genus"].is_null());
        assert!(json["confidence"].is_null());
        assert_eq!(
            json["message"],
            "No genus detected with sufficient confidence"
        );
    }

    #[test]
    fn test_ranked_serializes_flat() {
        let top = PredictionRecord::new("Monstera", 0.9, 0.5, true);
        let result = ClassificationResult::Ranked(RankedClassification {
            top_prediction: top.clone(),
            all_predictions: vec![top],
            model_type: "ONNX FP32".to_string(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["top_prediction"]["genus"], "Monstera");
        assert_eq!(json["model_type"], "ONNX FP32");
        assert_eq!(result.top_genus(), Some("Monstera"));
    }
}

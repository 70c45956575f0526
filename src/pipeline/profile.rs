//! Per-pipeline preprocessing and decision parameters.

use crate::constants::{
    DEFAULT_CLASSIFICATION_THRESHOLD, DEFAULT_DETECTION_THRESHOLD, DEFAULT_TOP_K, model_type,
};
use crate::inference::{Cardinality, OutputKind};
use crate::vision::Normalization;
use serde::Serialize;

/// Which of the two result shapes a pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Ranked top-k predictions with per-class thresholds.
    Classification,
    /// A single genus or nothing.
    GenusDetection,
}

/// Everything that distinguishes one pipeline from another apart from its
/// artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineProfile {
    /// Short name used in logs and errors.
    pub name: &'static str,
    /// Pixel normalization.
    pub normalization: Normalization,
    /// Whether the model emits logits or probabilities.
    pub output: OutputKind,
    /// How many classes are reported.
    pub cardinality: Cardinality,
    /// Threshold for classes without an explicit entry.
    pub default_threshold: f32,
    /// Model description reported with results.
    pub model_type: String,
}

impl PipelineProfile {
    /// Ranked classification over a logits model.
    pub fn classification(top_k: usize) -> Self {
        Self {
            name: "classification",
            normalization: Normalization::Unit,
            output: OutputKind::Logits,
            cardinality: Cardinality::TopK(top_k.max(1)),
            default_threshold: DEFAULT_CLASSIFICATION_THRESHOLD,
            model_type: model_type::CLASSIFICATION.to_string(),
        }
    }

    /// Single-genus detection over a probabilities model.
    pub fn genus_detection() -> Self {
        Self {
            name: "detection",
            normalization: Normalization::ImageNet,
            output: OutputKind::Probabilities,
            cardinality: Cardinality::SingleWithReject,
            default_threshold: DEFAULT_DETECTION_THRESHOLD,
            model_type: model_type::DETECTION.to_string(),
        }
    }

    /// Result shape this profile produces.
    pub const fn mode(&self) -> PipelineMode {
        match self.cardinality {
            Cardinality::TopK(_) => PipelineMode::Classification,
            Cardinality::SingleWithReject => PipelineMode::GenusDetection,
        }
    }

    /// Replace the default threshold.
    #[must_use]
    pub fn with_default_threshold(mut self, threshold: f32) -> Self {
        self.default_threshold = threshold;
        self
    }

    /// Replace the reported model type.
    #[must_use]
    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = model_type.into();
        self
    }
}

impl Default for PipelineProfile {
    fn default() -> Self {
        Self::classification(DEFAULT_TOP_K)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_profile() {
        let profile = PipelineProfile::classification(5);
        assert_eq!(profile.normalization, Normalization::Unit);
        assert_eq!(profile.output, OutputKind::Logits);
        assert_eq!(profile.cardinality, Cardinality::TopK(5));
        assert!((profile.default_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(profile.model_type, "ONNX FP32");
        assert_eq!(profile.mode(), PipelineMode::Classification);
    }

    #[test]
    fn test_detection_profile() {
        let profile = PipelineProfile::genus_detection();
        assert_eq!(profile.normalization, Normalization::ImageNet);
        assert_eq!(profile.output, OutputKind::Probabilities);
        assert_eq!(profile.cardinality, Cardinality::SingleWithReject);
        assert!((profile.default_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(profile.mode(), PipelineMode::GenusDetection);
    }

    #[test]
    fn test_top_k_is_at_least_one() {
        assert_eq!(
            PipelineProfile::classification(0).cardinality,
            Cardinality::TopK(1)
        );
    }
}

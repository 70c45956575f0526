//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CLASSIFICATION_THRESHOLD, DEFAULT_DETECTION_THRESHOLD, DEFAULT_MAX_IMAGE_BYTES,
    DEFAULT_SESSION_POOL_SIZE, DEFAULT_TOP_K, artifacts,
};
use crate::inference::{EngineOptions, OptimizationLevel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ranked classification pipeline artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ModelConfig>,

    /// Genus detection pipeline artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<ModelConfig>,

    /// Default decision settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Inference settings.
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Config {
    /// Fill both pipelines from the conventional file names inside `dir`.
    ///
    /// Pipelines already configured are replaced.
    pub fn apply_models_dir(&mut self, dir: &Path) {
        let labels = dir.join(artifacts::LABELS);
        self.classification = Some(ModelConfig {
            model: dir.join(artifacts::CLASSIFICATION_MODEL),
            labels: labels.clone(),
            thresholds: Some(dir.join(artifacts::THRESHOLDS)),
            model_type: None,
        });
        self.detection = Some(ModelConfig {
            model: dir.join(artifacts::DETECTION_MODEL),
            labels,
            thresholds: None,
            model_type: None,
        });
    }
}

/// Artifacts of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub model: PathBuf,

    /// Path to the label mapping JSON.
    pub labels: PathBuf,

    /// Optional per-class threshold JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<PathBuf>,

    /// Optional model type description override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
}

/// Default decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Number of ranked classification results.
    pub top_k: usize,

    /// Fallback per-class threshold for classification.
    pub classification_threshold: f32,

    /// Acceptance threshold for genus detection.
    pub detection_threshold: f32,

    /// Largest accepted encoded image in bytes.
    pub max_image_bytes: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            classification_threshold: DEFAULT_CLASSIFICATION_THRESHOLD,
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Intra-op threads per session (0 = runtime default).
    pub intra_threads: usize,

    /// Sessions per pipeline.
    pub session_pool_size: usize,

    /// Graph optimization level.
    pub optimization: OptimizationLevel,

    /// Explicit path to the ONNX Runtime shared library.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_library: Option<PathBuf>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            intra_threads: 0,
            session_pool_size: DEFAULT_SESSION_POOL_SIZE,
            optimization: OptimizationLevel::default(),
            runtime_library: None,
        }
    }
}

impl InferenceConfig {
    /// Session options for the engine.
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            intra_threads: self.intra_threads,
            pool_size: self.session_pool_size,
            optimization: self.optimization,
        }
    }
}

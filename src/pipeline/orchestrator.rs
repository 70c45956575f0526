//! Pipeline lifecycle and request path.

use super::profile::{PipelineMode, PipelineProfile};
use super::result::{
    ClassificationResult, GenusDetection, PipelineInfo, PipelineStatus, PredictionRecord,
    RankedClassification,
};
use crate::constants::DEFAULT_MAX_IMAGE_BYTES;
use crate::error::{Error, Result};
use crate::inference::calibrate::{self, Cardinality, Decision, ScoredClass};
use crate::inference::{
    BackendLoader, EngineOptions, InferenceBackend, OnnxLoader, validate_input_shape,
};
use crate::labels::{LabelCatalog, ThresholdTable};
use crate::vision::{PreprocessConfig, preprocess};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Static artifacts and parameters of one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// ONNX model file.
    pub model_path: PathBuf,
    /// Label mapping JSON.
    pub labels_path: PathBuf,
    /// Optional per-class threshold JSON.
    pub thresholds_path: Option<PathBuf>,
    /// Preprocessing and decision parameters.
    pub profile: PipelineProfile,
    /// Largest accepted encoded image.
    pub max_image_bytes: usize,
    /// Session options for the production loader.
    pub engine: EngineOptions,
}

impl PipelineConfig {
    /// Config with default limits and engine options.
    pub fn new(
        model_path: impl Into<PathBuf>,
        labels_path: impl Into<PathBuf>,
        profile: PipelineProfile,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
            thresholds_path: None,
            profile,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            engine: EngineOptions::default(),
        }
    }

    /// Attach a per-class threshold file.
    #[must_use]
    pub fn with_thresholds(mut self, path: impl Into<PathBuf>) -> Self {
        self.thresholds_path = Some(path.into());
        self
    }
}

/// Per-request adjustments.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifyOverrides {
    /// Number of ranked classes (classification only).
    pub top_k: Option<usize>,
    /// Detection: the acceptance threshold. Classification: the fallback for
    /// classes without a table entry.
    pub threshold: Option<f32>,
}

struct ReadyState {
    catalog: LabelCatalog,
    thresholds: ThresholdTable,
    backend: Arc<dyn InferenceBackend>,
}

/// One model plus its labels, thresholds and decision profile.
///
/// Created uninitialized. [`Pipeline::initialize`] loads everything exactly
/// once; afterwards [`Pipeline::classify`] can be called from any number of
/// threads.
pub struct Pipeline {
    config: PipelineConfig,
    loader: Arc<dyn BackendLoader>,
    ready: OnceLock<ReadyState>,
    init_lock: Mutex<()>,
    initializing: AtomicBool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.config.profile.name)
            .field("model_path", &self.config.model_path)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline that loads its model with ONNX Runtime.
    pub fn new(config: PipelineConfig) -> Self {
        let loader = Arc::new(OnnxLoader::new(config.engine));
        Self::with_loader(config, loader)
    }

    /// Pipeline that loads its model through `loader`.
    pub fn with_loader(config: PipelineConfig, loader: Arc<dyn BackendLoader>) -> Self {
        Self {
            config,
            loader,
            ready: OnceLock::new(),
            init_lock: Mutex::new(()),
            initializing: AtomicBool::new(false),
        }
    }

    /// Pipeline name from its profile.
    pub fn name(&self) -> &'static str {
        self.config.profile.name
    }

    /// Load labels, thresholds and model.
    ///
    /// Idempotent. Concurrent callers block until the first finishes; only one
    /// load ever takes effect. A failed load leaves the pipeline uninitialized
    /// so a later call can retry.
    ///
    /// # Errors
    ///
    /// Returns configuration errors for bad label or threshold files and
    /// model-load errors for a missing or unusable model.
    pub fn initialize(&self) -> Result<()> {
        if self.ready.get().is_some() {
            return Ok(());
        }

        let _guard = self.init_lock.lock().map_err(|_| Error::Internal {
            message: format!("{} pipeline init lock poisoned", self.name()),
        })?;

        if self.ready.get().is_some() {
            debug!("{} pipeline already initialized", self.name());
            return Ok(());
        }

        self.initializing.store(true, Ordering::Release);
        let loaded = self.load();
        self.initializing.store(false, Ordering::Release);

        match loaded {
            Ok(state) => {
                // Only this thread sets the cell while holding the guard.
                let _ = self.ready.set(state);
                Ok(())
            }
            Err(e) => {
                warn!("{} pipeline initialization failed: {e}", self.name());
                Err(e)
            }
        }
    }

    fn load(&self) -> Result<ReadyState> {
        let start = Instant::now();
        let profile = &self.config.profile;
        info!("Initializing {} pipeline", profile.name);

        let catalog = LabelCatalog::load(&self.config.labels_path)?;
        let thresholds = match &self.config.thresholds_path {
            Some(path) => ThresholdTable::load(path, &catalog, profile.default_threshold)?,
            None => ThresholdTable::uniform(profile.default_threshold),
        };

        let backend = self.loader.load(&self.config.model_path)?;
        if let Some(declared) = backend.declared_classes() {
            catalog.ensure_cardinality(declared).inspect_err(|e| error!("{e}"))?;
        }

        info!(
            "{} pipeline ready: {} classes, model {} ({:.2?})",
            profile.name,
            catalog.len(),
            self.config.model_path.display(),
            start.elapsed()
        );

        Ok(ReadyState {
            catalog,
            thresholds,
            backend,
        })
    }

    /// Whether [`Pipeline::initialize`] has succeeded.
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> PipelineStatus {
        if self.ready.get().is_some() {
            PipelineStatus::Ready
        } else if self.initializing.load(Ordering::Acquire) {
            PipelineStatus::Initializing
        } else {
            PipelineStatus::NotInitialized
        }
    }

    /// Classify one encoded image with the profile defaults.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::classify_with`].
    pub fn classify(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        self.classify_with(bytes, &ClassifyOverrides::default())
    }

    /// Classify one encoded image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before initialization, decode errors
    /// for unreadable images, [`Error::ShapeMismatch`] or [`Error::Inference`]
    /// from the model, and [`Error::UnknownClass`] if the model reports an
    /// index the catalog does not know.
    pub fn classify_with(
        &self,
        bytes: &[u8],
        overrides: &ClassifyOverrides,
    ) -> Result<ClassificationResult> {
        let state = self.ready.get().ok_or_else(|| Error::NotInitialized {
            pipeline: self.name().to_string(),
        })?;
        let profile = &self.config.profile;
        let start = Instant::now();

        let tensor = preprocess(
            bytes,
            &PreprocessConfig {
                normalization: profile.normalization,
                max_image_bytes: self.config.max_image_bytes,
            },
        )?;
        let preprocessed = start.elapsed();

        let backend = &state.backend;
        validate_input_shape(backend.input_name(), backend.input_shape(), tensor.shape())?;
        let raw = backend.run(&tensor)?;
        if raw.is_empty() {
            return Err(Error::Inference {
                reason: "model produced an empty output".to_string(),
            });
        }
        let probabilities = calibrate::to_probabilities(raw, profile.output);

        let result = match profile.mode() {
            PipelineMode::Classification => {
                let k = match (overrides.top_k, profile.cardinality) {
                    (Some(k), _) | (None, Cardinality::TopK(k)) => k.max(1),
                    (None, Cardinality::SingleWithReject) => 1,
                };
                let fallback = overrides.threshold.unwrap_or(profile.default_threshold);
                let decision = calibrate::select(&probabilities, Cardinality::TopK(k), |id| {
                    state.thresholds.threshold_or(id, fallback)
                });
                self.ranked(state, decision)?
            }
            PipelineMode::GenusDetection => {
                let decision =
                    calibrate::select(&probabilities, Cardinality::SingleWithReject, |id| {
                        overrides
                            .threshold
                            .unwrap_or_else(|| state.thresholds.threshold_for(id))
                    });
                Self::detection(state, decision)?
            }
        };

        debug!(
            "{} classify: preprocess {:.2?}, total {:.2?}",
            profile.name,
            preprocessed,
            start.elapsed()
        );
        Ok(result)
    }

    fn ranked(&self, state: &ReadyState, decision: Decision) -> Result<ClassificationResult> {
        let classes = match decision {
            Decision::Selected(classes) => classes,
            Decision::Rejected { best } => vec![best],
        };

        let all_predictions = classes
            .iter()
            .map(|c| record(&state.catalog, c))
            .collect::<Result<Vec<_>>>()?;
        let top_prediction = all_predictions
            .first()
            .cloned()
            .ok_or_else(|| Error::Inference {
                reason: "no classes to rank".to_string(),
            })?;

        Ok(ClassificationResult::Ranked(RankedClassification {
            top_prediction,
            all_predictions,
            model_type: self.config.profile.model_type.clone(),
        }))
    }

    fn detection(state: &ReadyState, decision: Decision) -> Result<ClassificationResult> {
        let detection = match decision {
            Decision::Selected(classes) => match classes.first() {
                Some(best) => {
                    GenusDetection::detected(state.catalog.id_to_name(best.id)?, best.confidence)
                }
                None => GenusDetection::none(),
            },
            Decision::Rejected { best } => {
                debug!(
                    "Best class {} at {:.4} is below threshold {:.4}",
                    best.id, best.confidence, best.threshold
                );
                GenusDetection::none()
            }
        };
        Ok(ClassificationResult::Detection(detection))
    }

    /// Describe the pipeline. Model details appear once it is ready.
    pub fn info(&self) -> PipelineInfo {
        let profile = &self.config.profile;
        let ready = self.ready.get();
        PipelineInfo {
            name: profile.name.to_string(),
            status: self.status(),
            mode: profile.mode(),
            model_path: self.config.model_path.clone(),
            model_type: profile.model_type.clone(),
            num_classes: ready.map(|s| s.catalog.len()),
            input_shape: ready.map(|s| s.backend.input_shape().to_vec()),
            output_shape: ready.map(|s| s.backend.output_shape().to_vec()),
        }
    }
}

fn record(catalog: &LabelCatalog, class: &ScoredClass) -> Result<PredictionRecord> {
    Ok(PredictionRecord::new(
        catalog.id_to_name(class.id)?,
        class.confidence,
        class.threshold,
        class.is_confident,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::vision::ImageTensor;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::{Cursor, Write};
    use std::path::Path;
    use tempfile::NamedTempFile;

    struct FixedBackend {
        row: Vec<f32>,
        output_shape: Vec<i64>,
    }

    impl InferenceBackend for FixedBackend {
        fn input_name(&self) -> &str {
            "input"
        }
        fn input_shape(&self) -> &[i64] {
            &[1, 3, 224, 224]
        }
        fn output_shape(&self) -> &[i64] {
            &self.output_shape
        }
        fn run(&self, _input: &ImageTensor) -> Result<Vec<f32>> {
            Ok(self.row.clone())
        }
    }

    struct FixedLoader {
        row: Vec<f32>,
        output_shape: Vec<i64>,
    }

    impl BackendLoader for FixedLoader {
        fn load(&self, _path: &Path) -> Result<Arc<dyn InferenceBackend>> {
            Ok(Arc::new(FixedBackend {
                row: self.row.clone(),
                output_shape: self.output_shape.clone(),
            }))
        }
    }

    fn labels_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{json}").unwrap();
        file
    }

    fn png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([10, 200, 30])));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn pipeline(labels: &Path, profile: PipelineProfile, row: Vec<f32>) -> Pipeline {
        let classes = i64::try_from(row.len()).unwrap();
        Pipeline::with_loader(
            PipelineConfig::new("model.onnx", labels, profile),
            Arc::new(FixedLoader {
                row,
                output_shape: vec![1, classes],
            }),
        )
    }

    #[test]
    fn test_classify_before_initialize() {
        let labels = labels_file(r#"{"genus_to_id": {"Aloe": 0, "Ficus": 1}}"#);
        let p = pipeline(labels.path(), PipelineProfile::classification(5), vec![1.0, 0.0]);

        assert_eq!(p.status(), PipelineStatus::NotInitialized);
        let err = p.classify(&png()).unwrap_err();
        assert!(matches!(err, Error::NotInitialized { .. }));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let labels = labels_file(r#"{"genus_to_id": {"Aloe": 0, "Ficus": 1}}"#);
        let p = pipeline(labels.path(), PipelineProfile::classification(5), vec![1.0, 0.0]);

        p.initialize().unwrap();
        p.initialize().unwrap();
        assert!(p.is_ready());
        assert_eq!(p.info().num_classes, Some(2));
    }

    #[test]
    fn test_catalog_size_must_match_model() {
        let labels = labels_file(r#"{"genus_to_id": {"Aloe": 0, "Ficus": 1}}"#);
        let p = pipeline(
            labels.path(),
            PipelineProfile::classification(5),
            vec![1.0, 0.0, 0.5],
        );

        let err = p.initialize().unwrap_err();
        assert!(matches!(err, Error::InvalidLabels { .. }));
        assert_eq!(p.status(), PipelineStatus::NotInitialized);
    }

    #[test]
    fn test_top_k_override() {
        let labels = labels_file(r#"{"genus_to_id": {"Aloe": 0, "Ficus": 1, "Pothos": 2}}"#);
        let p = pipeline(
            labels.path(),
            PipelineProfile::classification(5),
            vec![0.0, 2.0, 1.0],
        );
        p.initialize().unwrap();

        let result = p
            .classify_with(
                &png(),
                &ClassifyOverrides {
                    top_k: Some(2),
                    threshold: None,
                },
            )
            .unwrap();
        let ClassificationResult::Ranked(ranked) = result else {
            panic!("expected ranked result");
        };
        assert_eq!(ranked.all_predictions.len(), 2);
        assert_eq!(ranked.top_prediction.genus, "Ficus");
        assert_eq!(ranked.all_predictions[1].genus, "Pothos");
    }

    #[test]
    fn test_detection_threshold_override() {
        let labels = labels_file(r#"{"genus_to_id": {"Aloe": 0, "Ficus": 1}}"#);
        let p = pipeline(labels.path(), PipelineProfile::genus_detection(), vec![0.3, 0.7]);
        p.initialize().unwrap();

        let result = p
            .classify_with(
                &png(),
                &ClassifyOverrides {
                    top_k: None,
                    threshold: Some(0.8),
                },
            )
            .unwrap();
        assert_eq!(result.top_genus(), None);

        let result = p.classify(&png()).unwrap();
        assert_eq!(result.top_genus(), Some("Ficus"));
    }

    #[test]
    fn test_info_before_ready_has_no_model_details() {
        let labels = labels_file(r#"{"genus_to_id": {"Aloe": 0}}"#);
        let p = pipeline(labels.path(), PipelineProfile::genus_detection(), vec![1.0]);

        let info = p.info();
        assert_eq!(info.status, PipelineStatus::NotInitialized);
        assert_eq!(info.mode, PipelineMode::GenusDetection);
        assert!(info.num_classes.is_none());
        assert!(info.input_shape.is_none());
    }
}

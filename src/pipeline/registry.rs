//! The set of pipelines a process serves.

use super::orchestrator::{Pipeline, PipelineConfig};
use super::profile::PipelineProfile;
use super::result::PipelineInfo;
use crate::config::{Config, ModelConfig};
use crate::error::{Error, Result};
use crate::inference::{BackendLoader, OnnxLoader};
use std::sync::Arc;
use tracing::info;

/// Optional classification and detection pipelines built from configuration.
///
/// Handed by reference (or inside an `Arc`) to whatever serves requests.
#[derive(Debug, Default)]
pub struct PipelineSet {
    classification: Option<Arc<Pipeline>>,
    detection: Option<Arc<Pipeline>>,
}

impl PipelineSet {
    /// Build uninitialized pipelines that load models with ONNX Runtime.
    pub fn from_config(config: &Config) -> Self {
        let loader = Arc::new(OnnxLoader::new(config.inference.engine_options()));
        Self::with_loader(config, loader)
    }

    /// Build uninitialized pipelines that load models through `loader`.
    pub fn with_loader(config: &Config, loader: Arc<dyn BackendLoader>) -> Self {
        let defaults = &config.defaults;

        let classification = config.classification.as_ref().map(|model| {
            let profile = PipelineProfile::classification(defaults.top_k)
                .with_default_threshold(defaults.classification_threshold);
            build(config, model, profile, Arc::clone(&loader))
        });

        let detection = config.detection.as_ref().map(|model| {
            let profile = PipelineProfile::genus_detection()
                .with_default_threshold(defaults.detection_threshold);
            build(config, model, profile, Arc::clone(&loader))
        });

        Self {
            classification,
            detection,
        }
    }

    /// Initialize every configured pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first initialization failure.
    pub fn initialize_all(&self) -> Result<()> {
        for pipeline in self.pipelines() {
            pipeline.initialize()?;
        }
        info!("{} pipeline(s) initialized", self.pipelines().count());
        Ok(())
    }

    /// The classification pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineNotConfigured`] if it has no artifacts.
    pub fn classification(&self) -> Result<&Arc<Pipeline>> {
        self.classification
            .as_ref()
            .ok_or(Error::PipelineNotConfigured {
                pipeline: "classification",
            })
    }

    /// The genus detection pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipelineNotConfigured`] if it has no artifacts.
    pub fn detection(&self) -> Result<&Arc<Pipeline>> {
        self.detection.as_ref().ok_or(Error::PipelineNotConfigured {
            pipeline: "detection",
        })
    }

    /// Descriptions of all configured pipelines.
    pub fn info(&self) -> Vec<PipelineInfo> {
        self.pipelines().map(|p| p.info()).collect()
    }

    /// Whether no pipeline is configured.
    pub fn is_empty(&self) -> bool {
        self.classification.is_none() && self.detection.is_none()
    }

    fn pipelines(&self) -> impl Iterator<Item = &Arc<Pipeline>> {
        self.classification.iter().chain(self.detection.iter())
    }
}

fn build(
    config: &Config,
    model: &ModelConfig,
    mut profile: PipelineProfile,
    loader: Arc<dyn BackendLoader>,
) -> Arc<Pipeline> {
    if let Some(model_type) = &model.model_type {
        profile = profile.with_model_type(model_type.clone());
    }

    let mut pipeline_config = PipelineConfig::new(&model.model, &model.labels, profile);
    pipeline_config.thresholds_path.clone_from(&model.thresholds);
    pipeline_config.max_image_bytes = config.defaults.max_image_bytes;
    pipeline_config.engine = config.inference.engine_options();

    Arc::new(Pipeline::with_loader(pipeline_config, loader))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_empty_config_has_no_pipelines() {
        let set = PipelineSet::from_config(&Config::default());
        assert!(set.is_empty());
        assert!(set.initialize_all().is_ok());
        assert!(matches!(
            set.classification(),
            Err(Error::PipelineNotConfigured {
                pipeline: "classification"
            })
        ));
        assert!(set.info().is_empty());
    }

    #[test]
    fn test_models_dir_configures_both() {
        let mut config = Config::default();
        config.apply_models_dir(Path::new("/nonexistent/models"));
        config.detection.as_mut().unwrap().model_type = Some("custom".to_string());

        let set = PipelineSet::from_config(&config);
        let info = set.info();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0].name, "classification");
        assert_eq!(info[1].model_type, "custom");
    }

    #[test]
    fn test_initialize_all_reports_missing_artifacts() {
        let mut config = Config::default();
        config.apply_models_dir(Path::new("/nonexistent/models"));

        let set = PipelineSet::from_config(&config);
        let err = set.initialize_all().unwrap_err();
        assert!(matches!(err, Error::LabelsRead { .. }));
    }
}

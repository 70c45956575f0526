//! Configuration validation.

use crate::config::{Config, ModelConfig};
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    validate_inference(config)?;
    Ok(())
}

/// Validate default settings.
fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    validate_threshold("classification_threshold", defaults.classification_threshold)?;
    validate_threshold("detection_threshold", defaults.detection_threshold)?;

    if defaults.top_k == 0 {
        return Err(Error::ConfigValidation {
            message: "top_k must be at least 1".to_string(),
        });
    }

    if defaults.max_image_bytes == 0 {
        return Err(Error::ConfigValidation {
            message: "max_image_bytes must be at least 1".to_string(),
        });
    }

    Ok(())
}

fn validate_inference(config: &Config) -> Result<()> {
    if config.inference.session_pool_size == 0 {
        return Err(Error::ConfigValidation {
            message: "session_pool_size must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_threshold(name: &str, value: f32) -> Result<()> {
    if (confidence::MIN..=confidence::MAX).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigValidation {
            message: format!(
                "{name} must be between {} and {}, got {value}",
                confidence::MIN,
                confidence::MAX
            ),
        })
    }
}

/// Check that the artifacts of a pipeline exist on disk.
pub fn validate_model_config(model: &ModelConfig) -> Result<()> {
    if !model.model.exists() {
        return Err(Error::ModelFileNotFound {
            path: model.model.clone(),
        });
    }

    for path in std::iter::once(&model.labels).chain(model.thresholds.as_ref()) {
        if !path.exists() {
            return Err(Error::ConfigValidation {
                message: format!("file does not exist: {}", path.display()),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_threshold() {
        let mut config = Config::default();
        config.defaults.detection_threshold = 1.5;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("detection_threshold"));
    }

    #[test]
    fn test_validate_nan_threshold() {
        let mut config = Config::default();
        config.defaults.classification_threshold = f32::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = Config::default();
        config.defaults.top_k = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_pool_size() {
        let mut config = Config::default();
        config.inference.session_pool_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_max_bytes() {
        let mut config = Config::default();
        config.defaults.max_image_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_model_config_missing_model() {
        let model = ModelConfig {
            model: PathBuf::from("/nonexistent/model_fp32.onnx"),
            labels: PathBuf::from("/nonexistent/label_mapping.json"),
            thresholds: None,
            model_type: None,
        };
        assert!(matches!(
            validate_model_config(&model),
            Err(Error::ModelFileNotFound { .. })
        ));
    }

    #[test]
    fn test_validate_model_config_missing_labels() {
        let model_file = NamedTempFile::new().unwrap();
        let model = ModelConfig {
            model: model_file.path().to_path_buf(),
            labels: PathBuf::from("/nonexistent/label_mapping.json"),
            thresholds: None,
            model_type: None,
        };
        assert!(matches!(
            validate_model_config(&model),
            Err(Error::ConfigValidation { .. })
        ));
    }
}

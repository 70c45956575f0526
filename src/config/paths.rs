//! Platform-specific configuration paths.

use crate::config::{Config, ModelConfig};
use crate::constants::APP_NAME;
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/plantid/`
/// - macOS: `~/Library/Application Support/plantid/`
/// - Windows: `%APPDATA%\plantid\`
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Resolve relative artifact paths against `base`, the directory holding
/// the config file they were read from.
pub fn resolve_artifact_paths(config: &mut Config, base: &Path) {
    for model in [&mut config.classification, &mut config.detection]
        .into_iter()
        .flatten()
    {
        resolve_model(model, base);
    }
    if let Some(lib) = config.inference.runtime_library.as_mut() {
        resolve(lib, base);
    }
}

fn resolve_model(model: &mut ModelConfig, base: &Path) {
    resolve(&mut model.model, base);
    resolve(&mut model.labels, base);
    if let Some(thresholds) = model.thresholds.as_mut() {
        resolve(thresholds, base);
    }
}

fn resolve(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, unsafe_code)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_dir_returns_path() {
        let path = config_dir().unwrap();
        assert!(path.to_string_lossy().contains("plantid"));
    }

    #[test]
    #[serial]
    fn test_config_file_path_ends_with_toml() {
        let path = config_file_path().unwrap();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_relative_paths_resolved_against_base() {
        let mut config = Config::default();
        config.classification = Some(ModelConfig {
            model: PathBuf::from("models/model_fp32.onnx"),
            labels: PathBuf::from("/abs/label_mapping.json"),
            thresholds: Some(PathBuf::from("thresholds.json")),
            model_type: None,
        });

        resolve_artifact_paths(&mut config, Path::new("/etc/plantid"));

        let classification = config.classification.unwrap();
        assert_eq!(
            classification.model,
            PathBuf::from("/etc/plantid/models/model_fp32.onnx")
        );
        assert_eq!(
            classification.labels,
            PathBuf::from("/abs/label_mapping.json")
        );
        assert_eq!(
            classification.thresholds,
            Some(PathBuf::from("/etc/plantid/thresholds.json"))
        );
    }

    #[test]
    #[serial]
    #[cfg(target_os = "linux")]
    fn test_config_dir_follows_xdg_config_home() {
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::var("XDG_CONFIG_HOME").ok();

        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", dir.path());
        }
        let path = config_file_path();
        unsafe {
            match original {
                Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert_eq!(path.unwrap(), dir.path().join("plantid").join("config.toml"));
    }
}

//! ONNX Runtime backed inference engine.

use super::backend::{BackendLoader, InferenceBackend, validate_input_shape};
use crate::constants::{APP_NAME, DEFAULT_SESSION_POOL_SIZE};
use crate::error::{Error, Result};
use crate::vision::ImageTensor;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Graph optimization level applied when building sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// No graph optimizations.
    Disable,
    /// Basic, semantics-preserving rewrites.
    Level1,
    /// Extended node fusions.
    Level2,
    /// All optimizations including layout changes.
    #[default]
    Level3,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => Self::Disable,
            OptimizationLevel::Level1 => Self::Level1,
            OptimizationLevel::Level2 => Self::Level2,
            OptimizationLevel::Level3 => Self::Level3,
        }
    }
}

/// Session construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Intra-op threads per session. `0` keeps the runtime default.
    pub intra_threads: usize,
    /// Number of sessions to keep. Requests are spread round-robin.
    pub pool_size: usize,
    /// Graph optimization level.
    pub optimization: OptimizationLevel,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            intra_threads: 0,
            pool_size: DEFAULT_SESSION_POOL_SIZE,
            optimization: OptimizationLevel::default(),
        }
    }
}

/// Load the ONNX Runtime shared library.
///
/// With `Some(path)` the library at `path` is used. With `None` the runtime is
/// located lazily through `ORT_DYLIB_PATH` or the system search path.
///
/// # Errors
///
/// Returns [`Error::RuntimeInitialization`] if the library cannot be loaded.
pub fn init_runtime(library: Option<&Path>) -> Result<()> {
    let Some(path) = library else {
        debug!("Using ONNX Runtime from ORT_DYLIB_PATH or system search path");
        return Ok(());
    };

    if !path.exists() {
        return Err(Error::RuntimeInitialization {
            reason: format!("runtime library not found: {}", path.display()),
        });
    }

    let committed = ort::init_from(path)
        .map_err(|e| Error::RuntimeInitialization {
            reason: e.to_string(),
        })?
        .with_name(APP_NAME)
        .commit();

    if committed {
        info!("Loaded ONNX Runtime from {}", path.display());
    } else {
        debug!("ONNX Runtime environment already initialized");
    }
    Ok(())
}

/// A model held as a small pool of ONNX Runtime sessions.
pub struct OnnxEngine {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    input_name: String,
    output_name: String,
    input_shape: Vec<i64>,
    output_shape: Vec<i64>,
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEngine")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_shape", &self.input_shape)
            .field("output_shape", &self.output_shape)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl OnnxEngine {
    /// Load the model at `path` into `options.pool_size` sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFileNotFound`] if the file does not exist and
    /// [`Error::ModelLoad`] if the runtime rejects it or it has no usable
    /// input or output.
    pub fn load(path: &Path, options: &EngineOptions) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ModelFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let start = Instant::now();
        let pool_size = options.pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            sessions.push(build_session(path, options)?);
        }

        let (input_name, input_shape, output_name, output_shape) = {
            let first = &sessions[0];
            let input = first.inputs().first().ok_or_else(|| Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "model declares no inputs".to_string(),
            })?;
            let output = first.outputs().first().ok_or_else(|| Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "model declares no outputs".to_string(),
            })?;
            (
                input.name().to_string(),
                tensor_shape(input.dtype()),
                output.name().to_string(),
                tensor_shape(output.dtype()),
            )
        };

        info!(
            "Loaded model {} ({} session(s), input '{}' {:?}, output '{}' {:?}) in {:.2?}",
            path.display(),
            pool_size,
            input_name,
            input_shape,
            output_name,
            output_shape,
            start.elapsed()
        );

        Ok(Self {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next_idx: AtomicUsize::new(0),
            input_name,
            output_name,
            input_shape,
            output_shape,
            model_path: path.to_path_buf(),
        })
    }
}

fn build_session(path: &Path, options: &EngineOptions) -> Result<Session> {
    let load_err = |reason: String| Error::ModelLoad {
        path: path.to_path_buf(),
        reason,
    };

    let mut builder = Session::builder()
        .map_err(|e| load_err(e.to_string()))?
        .with_optimization_level(options.optimization.into())
        .map_err(|e| load_err(e.to_string()))?;

    if options.intra_threads > 0 {
        builder = builder
            .with_intra_threads(options.intra_threads)
            .map_err(|e| load_err(e.to_string()))?;
    }

    builder
        .commit_from_file(path)
        .map_err(|e| load_err(e.to_string()))
}

fn tensor_shape(dtype: &ort::value::ValueType) -> Vec<i64> {
    dtype
        .tensor_shape()
        .map(|shape| shape.iter().copied().collect())
        .unwrap_or_default()
}

impl InferenceBackend for OnnxEngine {
    fn input_name(&self) -> &str {
        &self.input_name
    }

    fn input_shape(&self) -> &[i64] {
        &self.input_shape
    }

    fn output_shape(&self) -> &[i64] {
        &self.output_shape
    }

    fn run(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        validate_input_shape(&self.input_name, &self.input_shape, input.shape())?;

        let tensor = TensorRef::from_array_view(input).map_err(|e| Error::Inference {
            reason: format!("failed to convert input tensor: {e}"),
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => tensor];

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[idx].lock().map_err(|_| Error::Inference {
            reason: format!("session {}/{} lock poisoned", idx + 1, self.sessions.len()),
        })?;

        let start = Instant::now();
        let outputs = session.run(inputs).map_err(|e| Error::Inference {
            reason: e.to_string(),
        })?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| Error::Inference {
                reason: format!("model produced no output named '{}'", self.output_name),
            })?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Inference {
                reason: format!("failed to extract output tensor: {e}"),
            })?;

        debug!(
            "Session {} produced {} scores in {:.2?}",
            idx,
            data.len(),
            start.elapsed()
        );
        Ok(data.to_vec())
    }
}

/// Production [`BackendLoader`] that builds [`OnnxEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnnxLoader {
    options: EngineOptions,
}

impl OnnxLoader {
    /// Loader that builds engines with `options`.
    pub const fn new(options: EngineOptions) -> Self {
        Self { options }
    }
}

impl BackendLoader for OnnxLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn InferenceBackend>> {
        Ok(Arc::new(OnnxEngine::load(path, &self.options)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file() {
        let err = OnnxEngine::load(
            Path::new("/nonexistent/model_fp32.onnx"),
            &EngineOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ModelFileNotFound { .. }));
    }

    #[test]
    fn test_loader_reports_missing_model() {
        let loader = OnnxLoader::default();
        let err = loader
            .load(Path::new("/nonexistent/plant_genus_vit_fp16.onnx"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::ModelLoad);
    }

    #[test]
    fn test_missing_runtime_library() {
        let err = init_runtime(Some(Path::new("/nonexistent/libonnxruntime.so"))).unwrap_err();
        assert!(matches!(err, Error::RuntimeInitialization { .. }));
    }

    #[test]
    fn test_optimization_level_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: OptimizationLevel,
        }
        let parsed: Wrapper = toml::from_str(r#"level = "level2""#).unwrap();
        assert_eq!(parsed.level, OptimizationLevel::Level2);
    }

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert_eq!(options.pool_size, 1);
        assert_eq!(options.intra_threads, 0);
        assert_eq!(options.optimization, OptimizationLevel::Level3);
    }
}

//! Seam between the pipeline and the model runtime.

use crate::error::{Error, Result};
use crate::vision::ImageTensor;
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// A loaded model that maps one image tensor to one row of class scores.
///
/// Implementations must be safe to call from many threads at once.
pub trait InferenceBackend: Send + Sync {
    /// Name of the model input tensor.
    fn input_name(&self) -> &str;

    /// Declared input shape. Dynamic dimensions are `-1`.
    fn input_shape(&self) -> &[i64];

    /// Declared output shape. Dynamic dimensions are `-1`.
    fn output_shape(&self) -> &[i64];

    /// Run one forward pass and return the raw output row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if `input` does not fit the declared
    /// input shape and [`Error::Inference`] if the runtime fails.
    fn run(&self, input: &ImageTensor) -> Result<Vec<f32>>;

    /// Number of classes the model declares, when the last output
    /// dimension is static.
    fn declared_classes(&self) -> Option<usize> {
        self.output_shape()
            .last()
            .and_then(|&d| usize::try_from(d).ok())
    }
}

/// Loads a model file into a backend.
pub trait BackendLoader: Send + Sync {
    /// Load the model at `path`.
    ///
    /// # Errors
    ///
    /// Returns a model-load error if the file is missing or unusable.
    fn load(&self, path: &Path) -> Result<Arc<dyn InferenceBackend>>;
}

/// Check an input tensor shape against the model's declared shape.
///
/// Dynamic dimensions (`-1` or any negative value) match any size.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] when ranks differ or a static dimension
/// disagrees.
pub fn validate_input_shape(tensor: &str, declared: &[i64], actual: &[usize]) -> Result<()> {
    let matches = declared.len() == actual.len()
        && declared
            .iter()
            .zip(actual)
            .all(|(&d, &a)| d < 0 || usize::try_from(d).is_ok_and(|d| d == a));

    if matches {
        return Ok(());
    }

    let actual: Vec<i64> = actual
        .iter()
        .map(|&a| i64::try_from(a).unwrap_or(i64::MAX))
        .collect();
    error!("Input tensor '{tensor}' has shape {actual:?} but model declares {declared:?}");
    Err(Error::ShapeMismatch {
        tensor: tensor.to_string(),
        expected: declared.to_vec(),
        actual,
    })
}

//! Error types for plantid.

use std::path::PathBuf;

/// Result type alias for plantid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for plantid.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// The requested pipeline has no model configured.
    #[error("{pipeline} pipeline is not configured (set [{pipeline}] in config or use --models-dir)")]
    PipelineNotConfigured {
        /// Pipeline name.
        pipeline: &'static str,
    },

    /// Failed to read label mapping file.
    #[error("failed to read label mapping '{path}'")]
    LabelsRead {
        /// Path to the label mapping.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse label mapping file.
    #[error("failed to parse label mapping '{path}'")]
    LabelsParse {
        /// Path to the label mapping.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Label mapping parsed but is not a valid catalog.
    #[error("invalid label mapping: {message}")]
    InvalidLabels {
        /// Description of the problem.
        message: String,
    },

    /// Failed to read confidence threshold file.
    #[error("failed to read confidence thresholds '{path}'")]
    ThresholdsRead {
        /// Path to the threshold file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse confidence threshold file.
    #[error("failed to parse confidence thresholds '{path}'")]
    ThresholdsParse {
        /// Path to the threshold file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Threshold file contains an unusable value.
    #[error("invalid confidence threshold for '{class}': {value} (must be between 0.0 and 1.0)")]
    InvalidThresholds {
        /// Class the value belongs to.
        class: String,
        /// Offending value.
        value: f64,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Failed to initialize ONNX runtime.
    #[error("failed to initialize ONNX runtime: {reason}")]
    RuntimeInitialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// Failed to load the model into an inference session.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the model file.
        path: PathBuf,
        /// Description of the load failure.
        reason: String,
    },

    /// Inference was requested before the pipeline finished initializing.
    #[error("{pipeline} pipeline is not initialized")]
    NotInitialized {
        /// Pipeline name.
        pipeline: String,
    },

    /// Input bytes could not be decoded as an image.
    #[error("failed to decode image: {reason}")]
    ImageDecode {
        /// Description of the decode failure.
        reason: String,
    },

    /// Encoded input exceeds the configured size limit.
    #[error("image is too large: {size} bytes (max: {max})")]
    ImageTooLarge {
        /// Size of the input in bytes.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Failed to read an image file from disk.
    #[error("failed to read image file '{path}'")]
    ImageRead {
        /// Path to the image file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Tensor shape does not match what the model declares.
    #[error("tensor shape mismatch for '{tensor}': model expects {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Tensor name.
        tensor: String,
        /// Declared shape (dynamic dimensions are -1).
        expected: Vec<i64>,
        /// Actual shape.
        actual: Vec<i64>,
    },

    /// Model produced a class id that the label catalog does not know.
    #[error("model produced class id {id} but the label catalog has {catalog_size} classes")]
    UnknownClass {
        /// Class id from the model output.
        id: usize,
        /// Number of classes in the catalog.
        catalog_size: usize,
    },

    /// Inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// No valid image files found.
    #[error("no valid image files found in the provided paths")]
    NoValidImages,

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

/// Broad error category, used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed static artifact or setting. Fatal at startup.
    Configuration,
    /// Model could not be loaded. Fatal at startup.
    ModelLoad,
    /// Pipeline not ready yet. Retriable once initialization completes.
    NotInitialized,
    /// Unreadable input image. Per-request, reported as a client problem.
    Decode,
    /// Preprocessing and model disagree on tensor shape.
    ShapeMismatch,
    /// Model output and label catalog are out of sync.
    UnknownClass,
    /// Runtime failure inside the forward pass.
    Inference,
    /// Filesystem or unexpected internal failure.
    Internal,
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigDirNotFound
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigValidation { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. }
            | Self::PipelineNotConfigured { .. }
            | Self::LabelsRead { .. }
            | Self::LabelsParse { .. }
            | Self::InvalidLabels { .. }
            | Self::ThresholdsRead { .. }
            | Self::ThresholdsParse { .. }
            | Self::InvalidThresholds { .. } => ErrorKind::Configuration,
            Self::ModelFileNotFound { .. }
            | Self::RuntimeInitialization { .. }
            | Self::ModelLoad { .. } => ErrorKind::ModelLoad,
            Self::NotInitialized { .. } => ErrorKind::NotInitialized,
            Self::ImageDecode { .. } | Self::ImageTooLarge { .. } => ErrorKind::Decode,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::UnknownClass { .. } => ErrorKind::UnknownClass,
            Self::Inference { .. } => ErrorKind::Inference,
            Self::Io(_) | Self::ImageRead { .. } | Self::NoValidImages | Self::Internal { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the failure was caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }

    /// Stable `snake_case` identifier for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::ConfigDirNotFound => "config_dir_not_found",
            Self::ConfigRead { .. } => "config_read",
            Self::ConfigParse { .. } => "config_parse",
            Self::ConfigValidation { .. } => "config_validation",
            Self::ConfigWrite { .. } => "config_write",
            Self::ConfigSerialize { .. } => "config_serialize",
            Self::PipelineNotConfigured { .. } => "pipeline_not_configured",
            Self::LabelsRead { .. } => "labels_read",
            Self::LabelsParse { .. } => "labels_parse",
            Self::InvalidLabels { .. } => "invalid_labels",
            Self::ThresholdsRead { .. } => "thresholds_read",
            Self::ThresholdsParse { .. } => "thresholds_parse",
            Self::InvalidThresholds { .. } => "invalid_thresholds",
            Self::ModelFileNotFound { .. } => "model_file_not_found",
            Self::RuntimeInitialization { .. } => "runtime_initialization",
            Self::ModelLoad { .. } => "model_load",
            Self::NotInitialized { .. } => "not_initialized",
            Self::ImageDecode { .. } => "image_decode",
            Self::ImageTooLarge { .. } => "image_too_large",
            Self::ImageRead { .. } => "image_read",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::UnknownClass { .. } => "unknown_class",
            Self::Inference { .. } => "inference",
            Self::NoValidImages => "no_valid_images",
            Self::Internal { .. } => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_are_client_errors() {
        let err = Error::ImageDecode {
            reason: "bad header".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.is_client_error());

        let err = Error::ImageTooLarge { size: 10, max: 5 };
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_class_is_distinct_from_configuration() {
        let err = Error::UnknownClass {
            id: 7,
            catalog_size: 3,
        };
        assert_eq!(err.kind(), ErrorKind::UnknownClass);
        assert!(!err.is_client_error());
        assert_eq!(err.code(), "unknown_class");
    }

    #[test]
    fn test_not_initialized_kind() {
        let err = Error::NotInitialized {
            pipeline: "classification".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert!(err.to_string().contains("classification"));
    }

    #[test]
    fn test_label_errors_are_configuration() {
        let err = Error::InvalidLabels {
            message: "duplicate id".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

//! JSON envelope types for CLI output.
//!
//! Every structured event written to stdout is wrapped in a [`JsonEnvelope`],
//! one object per line, so the CLI can sit behind a web service or script.

use crate::error::{Error, ErrorKind};
use crate::pipeline::{ClassificationResult, PipelineInfo};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Version of the JSON event schema.
pub const SCHEMA_VERSION: &str = "1.0";

/// JSON envelope wrapping all CLI output events.
#[derive(Debug, Serialize)]
pub struct JsonEnvelope<T> {
    /// Event schema version.
    pub schema_version: String,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event type.
    pub event: EventType,
    /// Event-specific payload.
    pub payload: T,
}

impl<T: Serialize> JsonEnvelope<T> {
    /// Create a new envelope with the current timestamp.
    pub fn new(event: EventType, payload: T) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            event,
            payload,
        }
    }
}

/// Event types for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A batch of images is about to be classified.
    PipelineStarted,
    /// All images processed.
    PipelineCompleted,
    /// A command result (one per image for classify/detect).
    Result,
    /// Error occurred.
    Error,
}

/// Result type discriminator for result payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    /// Ranked classification of one image.
    Classification,
    /// Genus detection on one image.
    Detection,
    /// Pipeline descriptions.
    PipelineInfo,
    /// Configuration display.
    Config,
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Fatal error - the command cannot continue.
    Fatal,
    /// Warning - one image failed, the batch continues.
    Warning,
}

/// Error payload for error events.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Error code (`snake_case` identifier).
    pub code: String,
    /// Broad error category.
    pub kind: ErrorKind,
    /// Error severity.
    pub severity: ErrorSeverity,
    /// Human-readable error message.
    pub message: String,
    /// Suggested action to resolve the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Image the error belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ErrorPayload {
    /// Build a payload from an error.
    pub fn from_error(error: &Error, severity: ErrorSeverity, file: Option<PathBuf>) -> Self {
        Self {
            code: error.code().to_string(),
            kind: error.kind(),
            severity,
            message: error.to_string(),
            suggestion: suggestion_for(error).map(str::to_string),
            file,
        }
    }
}

/// A short hint for resolving `error`, if one applies.
pub fn suggestion_for(error: &Error) -> Option<&'static str> {
    match error {
        Error::PipelineNotConfigured { .. } => {
            Some("add the pipeline to config.toml or pass --models-dir")
        }
        Error::RuntimeInitialization { .. } => {
            Some("set ORT_DYLIB_PATH or inference.runtime_library to the ONNX Runtime library")
        }
        Error::ImageTooLarge { .. } => Some("raise defaults.max_image_bytes or resize the image"),
        _ => match error.kind() {
            ErrorKind::Configuration => {
                Some("run 'plantid config path' to locate the configuration file")
            }
            ErrorKind::ModelLoad => {
                Some("check that the model file exists and is a valid ONNX model")
            }
            ErrorKind::Decode => Some("use a JPEG, PNG, WebP, BMP or GIF image"),
            ErrorKind::ShapeMismatch | ErrorKind::UnknownClass => {
                Some("check that the label mapping belongs to the configured model")
            }
            ErrorKind::NotInitialized | ErrorKind::Inference | ErrorKind::Internal => None,
        },
    }
}

/// Batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// All images processed successfully.
    Success,
    /// Some images failed.
    PartialSuccess,
    /// All images failed.
    Failed,
}

impl BatchStatus {
    /// Status from success and failure counts.
    pub const fn from_counts(succeeded: usize, failed: usize) -> Self {
        if failed == 0 {
            Self::Success
        } else if succeeded == 0 {
            Self::Failed
        } else {
            Self::PartialSuccess
        }
    }
}

/// Payload for the `pipeline_started` event.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStartedPayload {
    /// Pipeline name.
    pub pipeline: String,
    /// Number of images to process.
    pub total_images: usize,
    /// Concurrent workers.
    pub jobs: usize,
}

/// Payload for the `pipeline_completed` event.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineCompletedPayload {
    /// Overall status.
    pub status: BatchStatus,
    /// Images classified successfully.
    pub images_processed: usize,
    /// Images that failed.
    pub images_failed: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Result payload for a single image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageResultPayload<'a> {
    /// Result type discriminator.
    pub result_type: ResultType,
    /// Image path.
    pub file: PathBuf,
    /// Pipeline output.
    pub result: &'a ClassificationResult,
}

/// Result payload for `info`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineInfoPayload {
    /// Result type discriminator.
    pub result_type: ResultType,
    /// One entry per configured pipeline.
    pub pipelines: Vec<PipelineInfo>,
}

/// Result payload for `config show`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPayload {
    /// Result type discriminator.
    pub result_type: ResultType,
    /// Config file the values were read from.
    pub config_path: PathBuf,
    /// Effective configuration.
    pub config: serde_json::Value,
}

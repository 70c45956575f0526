//! Result reporting for CLI output.
//!
//! Human mode prints readable blocks to stdout. JSON mode writes one
//! [`JsonEnvelope`] per line.

use super::OutputMode;
use super::human;
use crate::config::Config;
use crate::error::Error;
use crate::output::json_envelope::{
    BatchStatus, ConfigPayload, ErrorPayload, ErrorSeverity, EventType, ImageResultPayload,
    JsonEnvelope, PipelineCompletedPayload, PipelineInfoPayload, PipelineStartedPayload,
    ResultType,
};
use crate::pipeline::{ClassificationResult, PipelineInfo};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Counters for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Images classified successfully.
    pub processed: usize,
    /// Images that failed.
    pub failed: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Writes command results in the selected output mode.
pub struct Reporter {
    mode: OutputMode,
    writer: Mutex<Box<dyn Write + Send>>,
    write_error_logged: AtomicBool,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Reporter {
    /// Reporter writing to stdout.
    pub fn new(mode: OutputMode) -> Self {
        Self::with_writer(mode, io::stdout())
    }

    /// Reporter writing to `writer`.
    pub fn with_writer<W: Write + Send + 'static>(mode: OutputMode, writer: W) -> Self {
        Self {
            mode,
            writer: Mutex::new(Box::new(writer)),
            write_error_logged: AtomicBool::new(false),
        }
    }

    /// Selected output mode.
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Announce a batch.
    pub fn batch_started(&self, pipeline: &str, total_images: usize, jobs: usize) {
        if self.mode == OutputMode::Json {
            self.emit(
                EventType::PipelineStarted,
                PipelineStartedPayload {
                    pipeline: pipeline.to_string(),
                    total_images,
                    jobs,
                },
            );
        }
    }

    /// Report the result for one image.
    pub fn image_result(&self, file: &Path, result: &ClassificationResult) {
        match self.mode {
            OutputMode::Human => self.write_text(&human::format_result(file, result)),
            OutputMode::Json => {
                let result_type = match result {
                    ClassificationResult::Ranked(_) => ResultType::Classification,
                    ClassificationResult::Detection(_) => ResultType::Detection,
                };
                self.emit(
                    EventType::Result,
                    ImageResultPayload {
                        result_type,
                        file: file.to_path_buf(),
                        result,
                    },
                );
            }
        }
    }

    /// Report a failure for one image.
    pub fn image_error(&self, file: &Path, error: &Error) {
        match self.mode {
            OutputMode::Human => self.write_text(&human::format_image_error(file, error)),
            OutputMode::Json => self.emit(
                EventType::Error,
                ErrorPayload::from_error(error, ErrorSeverity::Warning, Some(file.to_path_buf())),
            ),
        }
    }

    /// Report the end of a batch.
    pub fn batch_completed(&self, summary: &BatchSummary) {
        match self.mode {
            OutputMode::Human => self.write_text(&human::format_summary(summary)),
            OutputMode::Json => self.emit(
                EventType::PipelineCompleted,
                PipelineCompletedPayload {
                    status: BatchStatus::from_counts(summary.processed, summary.failed),
                    images_processed: summary.processed,
                    images_failed: summary.failed,
                    duration_ms: summary.duration_ms,
                },
            ),
        }
    }

    /// Report pipeline descriptions.
    pub fn pipeline_info(&self, pipelines: &[PipelineInfo]) {
        match self.mode {
            OutputMode::Human => self.write_text(&human::format_pipeline_info(pipelines)),
            OutputMode::Json => self.emit(
                EventType::Result,
                PipelineInfoPayload {
                    result_type: ResultType::PipelineInfo,
                    pipelines: pipelines.to_vec(),
                },
            ),
        }
    }

    /// Report the effective configuration.
    pub fn config(&self, path: &Path, config: &Config) {
        match self.mode {
            OutputMode::Human => {
                let text = toml::to_string_pretty(config)
                    .unwrap_or_else(|e| format!("# failed to render config: {e}\n"));
                self.write_text(&format!("# {}\n{text}", path.display()));
            }
            OutputMode::Json => self.emit(
                EventType::Result,
                ConfigPayload {
                    result_type: ResultType::Config,
                    config_path: path.to_path_buf(),
                    config: serde_json::to_value(config).unwrap_or(serde_json::Value::Null),
                },
            ),
        }
    }

    /// Report a fatal error. Human mode leaves this to the caller's stderr.
    pub fn fatal(&self, error: &Error) {
        if self.mode == OutputMode::Json {
            self.emit(
                EventType::Error,
                ErrorPayload::from_error(error, ErrorSeverity::Fatal, None),
            );
        }
    }

    /// Write a plain line (human mode only).
    pub fn message(&self, text: &str) {
        if self.mode == OutputMode::Human {
            self.write_text(&format!("{text}\n"));
        }
    }

    fn emit<T: serde::Serialize>(&self, event: EventType, payload: T) {
        let envelope = JsonEnvelope::new(event, payload);
        match serde_json::to_string(&envelope) {
            Ok(json) => self.write_text(&format!("{json}\n")),
            Err(e) => tracing::error!("Failed to serialize {event:?} event: {e}"),
        }
    }

    fn write_text(&self, text: &str) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if let Err(e) = writer.write_all(text.as_bytes()).and_then(|()| writer.flush()) {
            // Log first error only to avoid spam on broken pipe
            if !self.write_error_logged.swap(true, Ordering::Relaxed) {
                tracing::warn!("Failed to write to stdout: {e} (subsequent errors suppressed)");
            }
        }
    }
}

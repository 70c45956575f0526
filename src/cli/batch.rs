//! Input discovery and concurrent batch classification.

use crate::constants::IMAGE_EXTENSIONS;
use crate::error::{Error, Result};
use crate::output::progress;
use crate::output::{BatchSummary, Reporter};
use crate::pipeline::{ClassificationResult, ClassifyOverrides, Pipeline};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Collect image files from input paths.
///
/// Directories are scanned recursively. Files are kept in input order;
/// directory contents are sorted by path.
pub fn collect_image_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_image_file(path) {
                files.push(path.clone());
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut found = Vec::new();
            collect_image_files_recursive(path, &mut found)?;
            found.sort();
            files.extend(found);
        } else {
            warn!("Skipping non-existent path: {}", path.display());
        }
    }

    Ok(files)
}

fn collect_image_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_image_files_recursive(&path, files)?;
        } else if is_image_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

/// Check if a file has a supported image extension.
fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(OsStr::new(known)))
    })
}

/// Batch execution settings.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Concurrent workers.
    pub jobs: usize,
    /// Stop at the first failed image.
    pub fail_fast: bool,
    /// Show a progress bar on stderr.
    pub progress: bool,
    /// Per-request adjustments.
    pub overrides: ClassifyOverrides,
}

/// Read and classify one image file.
pub fn classify_file(
    pipeline: &Pipeline,
    path: &Path,
    overrides: &ClassifyOverrides,
) -> Result<ClassificationResult> {
    let bytes = std::fs::read(path).map_err(|e| Error::ImageRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    pipeline.classify_with(&bytes, overrides)
}

/// Classify `files` on a multi-threaded runtime, reporting results in input
/// order.
///
/// Each image runs on the blocking pool; at most `options.jobs` run at once.
///
/// # Errors
///
/// With `fail_fast`, returns the first per-image error. Otherwise per-image
/// errors are reported and counted, and only runtime failures are returned.
pub fn run_batch(
    pipeline: &Arc<Pipeline>,
    files: Vec<PathBuf>,
    options: &BatchOptions,
    reporter: &Reporter,
) -> Result<BatchSummary> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(options.jobs.clamp(1, 4))
        .max_blocking_threads(options.jobs.max(1))
        .build()
        .map_err(|e| Error::Internal {
            message: format!("failed to create async runtime: {e}"),
        })?;

    runtime.block_on(classify_all(pipeline, files, options, reporter))
}

async fn classify_all(
    pipeline: &Arc<Pipeline>,
    files: Vec<PathBuf>,
    options: &BatchOptions,
    reporter: &Reporter,
) -> Result<BatchSummary> {
    let start = Instant::now();
    let total = files.len();
    let jobs = options.jobs.max(1);

    reporter.batch_started(pipeline.name(), total, jobs);
    info!(
        "Classifying {total} image(s) with {} pipeline ({jobs} job(s))",
        pipeline.name()
    );

    let semaphore = Arc::new(Semaphore::new(jobs));
    let cancelled = Arc::new(AtomicBool::new(false));
    let overrides = options.overrides;

    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            let semaphore = Arc::clone(&semaphore);
            let cancelled = Arc::clone(&cancelled);
            let pipeline = Arc::clone(pipeline);
            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (path, None);
                };
                if cancelled.load(Ordering::Relaxed) {
                    return (path, None);
                }
                let task_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    classify_file(&pipeline, &task_path, &overrides)
                })
                .await
                .unwrap_or_else(|e| {
                    Err(Error::Internal {
                        message: format!("classification task failed: {e}"),
                    })
                });
                (path, Some(outcome))
            })
        })
        .collect();

    let pb = progress::create_image_progress(total, options.progress);
    let mut summary = BatchSummary::default();
    let mut first_error = None;

    for handle in handles {
        let (path, outcome) = handle.await.map_err(|e| Error::Internal {
            message: format!("classification task failed: {e}"),
        })?;
        let Some(outcome) = outcome else {
            continue;
        };

        match outcome {
            Ok(result) => {
                summary.processed += 1;
                debug!("{}: {:?}", path.display(), result.top_genus());
                progress::suspend(pb.as_ref(), || reporter.image_result(&path, &result));
            }
            Err(e) => {
                summary.failed += 1;
                error!("Failed to classify {}: {e}", path.display());
                progress::suspend(pb.as_ref(), || reporter.image_error(&path, &e));
                if options.fail_fast && first_error.is_none() {
                    cancelled.store(true, Ordering::Relaxed);
                    first_error = Some(e);
                }
            }
        }
        progress::inc_progress(pb.as_ref());
    }

    let elapsed = start.elapsed();
    summary.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    if let Some(e) = first_error {
        progress::finish_progress(pb, "Failed");
        return Err(e);
    }

    progress::finish_progress(pb, "Complete");
    info!(
        "Complete: {} classified, {} failed in {:.2?}",
        summary.processed, summary.failed, elapsed
    );
    if total > 1 {
        reporter.batch_completed(&summary);
    }
    Ok(summary)
}

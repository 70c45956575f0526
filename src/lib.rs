//! Plantid - plant genus identification from photos.
//!
//! The library exposes two ONNX image-classification pipelines: a ranked
//! top-k classifier with per-class calibrated thresholds, and a single-genus
//! detector that rejects low-confidence images. The `plantid` binary is a thin
//! CLI over [`pipeline::PipelineSet`].

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod labels;
pub mod output;
pub mod pipeline;
pub mod vision;

use clap::Parser;
use cli::batch::{BatchOptions, collect_image_files, run_batch};
use cli::{Cli, Command, ConfigAction, GlobalArgs};
use config::{
    Config, config_file_path, load_config_file, resolve_artifact_paths, save_config,
    validate_config,
};
use output::{OutputMode, Reporter};
use pipeline::{ClassifyOverrides, Pipeline, PipelineSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for plantid CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet);

    let reporter = Reporter::new(cli.global.output_mode);
    let result = handle_command(cli.command, &cli.global, &reporter);
    if let Err(e) = &result {
        reporter.fatal(e);
    }
    result
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is noisy at info level; -v shows its warnings, -vv its info.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace,ort=debug".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // stdout carries results, so logs go to stderr.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_command(command: Command, global: &GlobalArgs, reporter: &Reporter) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action, global, reporter),
        Command::Info { load } => {
            let (config, _) = load_config(global)?;
            let pipelines = PipelineSet::from_config(&config);
            if load {
                inference::init_runtime(config.inference.runtime_library.as_deref())?;
                pipelines.initialize_all()?;
            }
            reporter.pipeline_info(&pipelines.info());
            Ok(())
        }
        Command::Classify(args) => {
            let (config, _) = load_config(global)?;
            let pipelines = PipelineSet::from_config(&config);
            let overrides = ClassifyOverrides {
                top_k: args.top_k,
                threshold: args.threshold,
            };
            classify_images(
                pipelines.classification()?,
                &config,
                &args.inputs,
                overrides,
                global,
                reporter,
            )
        }
        Command::Detect(args) => {
            let (config, _) = load_config(global)?;
            let pipelines = PipelineSet::from_config(&config);
            let overrides = ClassifyOverrides {
                top_k: None,
                threshold: args.threshold,
            };
            classify_images(
                pipelines.detection()?,
                &config,
                &args.inputs,
                overrides,
                global,
                reporter,
            )
        }
    }
}

/// Load, resolve and validate configuration for the current invocation.
///
/// Returns the config together with the file it was read from.
fn load_config(global: &GlobalArgs) -> Result<(Config, PathBuf)> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };

    let mut config = load_config_file(&path)?;
    if let Some(base) = path.parent() {
        resolve_artifact_paths(&mut config, base);
    }
    if let Some(dir) = &global.models_dir {
        config.apply_models_dir(dir);
    }

    validate_config(&config)?;
    Ok((config, path))
}

fn classify_images(
    pipeline: &Arc<Pipeline>,
    config: &Config,
    inputs: &[PathBuf],
    overrides: ClassifyOverrides,
    global: &GlobalArgs,
    reporter: &Reporter,
) -> Result<()> {
    let files = collect_image_files(inputs)?;
    if files.is_empty() {
        return Err(Error::NoValidImages);
    }
    info!("Found {} image file(s)", files.len());

    inference::init_runtime(config.inference.runtime_library.as_deref())?;
    pipeline.initialize()?;

    let jobs = global.jobs.unwrap_or_else(default_jobs);
    let options = BatchOptions {
        jobs,
        fail_fast: global.fail_fast,
        progress: reporter.mode() == OutputMode::Human && !global.quiet && !global.no_progress,
        overrides,
    };

    let summary = run_batch(pipeline, files, &options, reporter)?;
    if summary.failed > 0 {
        warn!("{} image(s) had errors", summary.failed);
        if summary.processed == 0 {
            return Err(Error::Inference {
                reason: format!("all {} image(s) failed", summary.failed),
            });
        }
    }
    Ok(())
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get().min(4))
}

fn handle_config_command(
    action: ConfigAction,
    global: &GlobalArgs,
    reporter: &Reporter,
) -> Result<()> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                reporter.message(&format!(
                    "Configuration file already exists: {}",
                    path.display()
                ));
            } else {
                save_config(&Config::default(), &path)?;
                reporter.message(&format!("Created configuration file: {}", path.display()));
                reporter.message("\nNext steps:");
                reporter.message(
                    "  add [classification] and [detection] sections, or pass --models-dir <dir>",
                );
            }
            Ok(())
        }
        ConfigAction::Show => {
            let (config, path) = load_config(global)?;
            reporter.config(&path, &config);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

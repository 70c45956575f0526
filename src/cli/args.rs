//! CLI argument definitions.

use super::validators::{parse_confidence, parse_positive};
use crate::output::OutputMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Plant genus identification from photos.
#[derive(Debug, Parser)]
#[command(name = "plantid")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by all commands.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by all commands.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalArgs {
    /// Path to the configuration file.
    #[arg(long, global = true, env = "PLANTID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding model_fp32.onnx, plant_genus_vit_fp16.onnx,
    /// label_mapping.json and confidence_threshold_results.json.
    #[arg(long, global = true, env = "PLANTID_MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Output mode for results on stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Human, env = "PLANTID_OUTPUT_MODE")]
    pub output_mode: OutputMode,

    /// Number of images classified concurrently.
    #[arg(short, long, global = true, value_parser = parse_positive, env = "PLANTID_JOBS")]
    pub jobs: Option<usize>,

    /// Stop on first failed image.
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Disable the progress bar.
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rank the most likely genera for each image.
    Classify(ClassifyArgs),
    /// Report a single genus per image, or none below the threshold.
    Detect(DetectArgs),
    /// Describe the configured pipelines.
    Info {
        /// Load the models and report their shapes.
        #[arg(long)]
        load: bool,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for `classify`.
#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Image files or directories.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Number of ranked genera per image.
    #[arg(short = 'k', long, value_parser = parse_positive, env = "PLANTID_TOP_K")]
    pub top_k: Option<usize>,

    /// Fallback threshold for genera without a calibrated threshold (0.0-1.0).
    #[arg(short = 't', long, value_parser = parse_confidence)]
    pub threshold: Option<f32>,
}

/// Arguments for `detect`.
#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Image files or directories.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Minimum confidence for a detection (0.0-1.0).
    #[arg(short = 't', long, value_parser = parse_confidence, env = "PLANTID_DETECTION_THRESHOLD")]
    pub threshold: Option<f32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_classify() {
        let cli = Cli::try_parse_from(["plantid", "classify", "leaf.jpg", "-k", "3"]).unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.inputs, vec![PathBuf::from("leaf.jpg")]);
        assert_eq!(args.top_k, Some(3));
        assert_eq!(cli.global.output_mode, OutputMode::Human);
    }

    #[test]
    fn test_cli_parse_detect_with_globals() {
        let cli = Cli::try_parse_from([
            "plantid",
            "detect",
            "photos/",
            "--threshold",
            "0.6",
            "--output-mode",
            "json",
            "-j",
            "4",
            "-q",
        ])
        .unwrap();
        let Command::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.threshold, Some(0.6));
        assert_eq!(cli.global.output_mode, OutputMode::Json);
        assert_eq!(cli.global.jobs, Some(4));
        assert!(cli.global.quiet);
    }

    #[test]
    fn test_cli_rejects_zero_top_k() {
        assert!(Cli::try_parse_from(["plantid", "classify", "a.jpg", "--top-k", "0"]).is_err());
    }

    #[test]
    fn test_cli_rejects_out_of_range_threshold() {
        assert!(Cli::try_parse_from(["plantid", "detect", "a.jpg", "-t", "1.5"]).is_err());
    }

    #[test]
    fn test_cli_requires_inputs() {
        assert!(Cli::try_parse_from(["plantid", "classify"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["plantid", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_cli_parse_info_load() {
        let cli = Cli::try_parse_from(["plantid", "info", "--load", "-v"]).unwrap();
        assert!(matches!(cli.command, Command::Info { load: true }));
        assert_eq!(cli.global.verbose, 1);
    }
}

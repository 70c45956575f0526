//! Output formatting for CLI results.

mod human;
pub mod json_envelope;
pub mod progress;
mod reporter;

pub use reporter::{BatchSummary, Reporter};

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Readable text.
    #[default]
    Human,
    /// One JSON envelope per line.
    Json,
}

//! CLI argument parsing and command handling.

mod args;
pub mod batch;
mod validators;

pub use args::{ClassifyArgs, Cli, Command, ConfigAction, DetectArgs, GlobalArgs};

//! Class labels and per-class confidence thresholds.

mod catalog;
mod thresholds;

pub use catalog::LabelCatalog;
pub use thresholds::ThresholdTable;

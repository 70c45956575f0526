//! Model execution and output calibration.

mod backend;
pub mod calibrate;
mod engine;

pub use backend::{BackendLoader, InferenceBackend, validate_input_shape};
pub use calibrate::{Cardinality, Decision, OutputKind, ScoredClass};
pub use engine::{EngineOptions, OnnxEngine, OnnxLoader, OptimizationLevel, init_runtime};

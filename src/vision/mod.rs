//! Image decoding and tensor preparation.

mod preprocess;

pub use preprocess::{ImageTensor, Normalization, PreprocessConfig, preprocess, preprocess_image};

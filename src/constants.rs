//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "plantid";

/// Side length in pixels of the square model input.
pub const INPUT_SIZE: u32 = 224;

/// Number of colour channels in the model input.
pub const INPUT_CHANNELS: usize = 3;

/// Default number of ranked predictions returned by the classification pipeline.
pub const DEFAULT_TOP_K: usize = 5;

/// Default per-class threshold for the classification pipeline.
pub const DEFAULT_CLASSIFICATION_THRESHOLD: f32 = 0.5;

/// Default acceptance threshold for the genus detection pipeline.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.4;

/// Maximum accepted size of an encoded image (20 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Maximum decoded width or height in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 16_384;

/// Default number of inference sessions per pipeline.
pub const DEFAULT_SESSION_POOL_SIZE: usize = 1;

/// Image file extensions picked up when scanning directories.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// ImageNet per-channel normalization statistics (RGB order).
pub mod imagenet {
    /// Channel means.
    pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    /// Channel standard deviations.
    pub const STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// Model type labels reported alongside results.
pub mod model_type {
    /// Classification pipeline model.
    pub const CLASSIFICATION: &str = "ONNX FP32";
    /// Genus detection pipeline model.
    pub const DETECTION: &str = "ONNX ViT FP16";
}

/// Conventional artifact names inside a models directory.
pub mod artifacts {
    /// Classification model.
    pub const CLASSIFICATION_MODEL: &str = "model_fp32.onnx";
    /// Genus detection model.
    pub const DETECTION_MODEL: &str = "plant_genus_vit_fp16.onnx";
    /// Label mapping shared by both pipelines.
    pub const LABELS: &str = "label_mapping.json";
    /// Per-class thresholds for the classification pipeline.
    pub const THRESHOLDS: &str = "confidence_threshold_results.json";
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
    /// Decimal places kept in detection confidences.
    pub const DECIMAL_PLACES: i32 = 4;
}

/// Detection pipeline messages.
pub mod messages {
    /// Returned when no class clears the threshold.
    pub const NO_DETECTION: &str = "No genus detected with sufficient confidence";
}

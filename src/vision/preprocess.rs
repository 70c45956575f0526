//! Turn encoded image bytes into a normalized NCHW tensor.

use crate::constants::{
    DEFAULT_MAX_IMAGE_BYTES, INPUT_CHANNELS, INPUT_SIZE, MAX_IMAGE_DIMENSION, imagenet,
};
use crate::error::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Limits};
use ndarray::Array4;
use std::io::Cursor;

/// Model input tensor of shape `(1, 3, 224, 224)`.
pub type ImageTensor = Array4<f32>;

/// Pixel normalization applied after scaling to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Values stay in `[0, 1]`.
    Unit,
    /// Per-channel ImageNet standardization.
    #[serde(rename = "imagenet")]
    ImageNet,
}

/// Preprocessing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    /// Normalization mode.
    pub normalization: Normalization,
    /// Largest accepted encoded input.
    pub max_image_bytes: usize,
}

impl PreprocessConfig {
    /// Config with the default byte limit.
    pub const fn new(normalization: Normalization) -> Self {
        Self {
            normalization,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Decode `bytes` and produce the model input tensor.
///
/// The format is sniffed from content, so file extensions do not matter.
///
/// # Errors
///
/// Returns [`Error::ImageTooLarge`] when `bytes` exceeds the configured limit
/// and [`Error::ImageDecode`] when the content is empty, corrupt, or in an
/// unsupported format.
pub fn preprocess(bytes: &[u8], config: &PreprocessConfig) -> Result<ImageTensor> {
    if bytes.is_empty() {
        return Err(Error::ImageDecode {
            reason: "empty input".to_string(),
        });
    }
    if bytes.len() > config.max_image_bytes {
        return Err(Error::ImageTooLarge {
            size: bytes.len(),
            max: config.max_image_bytes,
        });
    }

    let image = decode(bytes)?;
    Ok(preprocess_image(&image, config))
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::ImageDecode {
            reason: e.to_string(),
        })?;
    reader.limits(limits);

    reader.decode().map_err(|e| Error::ImageDecode {
        reason: e.to_string(),
    })
}

/// Produce the model input tensor from an already decoded image.
///
/// Alpha is dropped and grayscale replicated to three channels. The image is
/// stretched to 224x224 with bilinear filtering, so aspect ratio is not kept.
pub fn preprocess_image(image: &DynamicImage, config: &PreprocessConfig) -> ImageTensor {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let side = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, INPUT_CHANNELS, side, side));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..INPUT_CHANNELS {
            let value = f32::from(pixel[c]) / 255.0;
            let value = match config.normalization {
                Normalization::Unit => value,
                Normalization::ImageNet => (value - imagenet::MEAN[c]) / imagenet::STD[c],
            };
            tensor[[0, c, y as usize, x as usize]] = value;
        }
    }

    tensor
}

//! Image preprocessor trait

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_TARGET_WIDTH: u32 = 1500;
pub const MAX_TARGET_WIDTH: u32 = 2000;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Invalid preprocessing parameters: {0}")]
    InvalidParams(String),
}

/// Parameters for preparing a still image for OCR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Output width in pixels, aspect ratio preserved
    pub target_width: u32,
    /// Contrast multiplier, 1.0 leaves the image unchanged
    pub contrast: f32,
    /// Unsharp mask blur radius
    pub sharpen_sigma: f32,
    /// Unsharp mask threshold
    pub sharpen_threshold: i32,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            target_width: 1800,
            contrast: 1.5,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
        }
    }
}

impl PreprocessParams {
    /// Sets the output width
    pub fn with_target_width(mut self, width: u32) -> Self {
        self.target_width = width;
        self
    }

    /// Sets the contrast multiplier
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn validate(&self) -> Result<(), PreprocessError> {
        if !(MIN_TARGET_WIDTH..=MAX_TARGET_WIDTH).contains(&self.target_width) {
            return Err(PreprocessError::InvalidParams(format!(
                "target width {} outside {MIN_TARGET_WIDTH}..={MAX_TARGET_WIDTH}",
                self.target_width
            )));
        }
        if !self.contrast.is_finite() || self.contrast <= 0.0 {
            return Err(PreprocessError::InvalidParams(format!(
                "contrast {} must be positive",
                self.contrast
            )));
        }
        if !self.sharpen_sigma.is_finite() || self.sharpen_sigma < 0.0 {
            return Err(PreprocessError::InvalidParams(format!(
                "sharpen sigma {} must not be negative",
                self.sharpen_sigma
            )));
        }
        Ok(())
    }
}

/// Trait for turning an encoded photo into an OCR-ready image
///
/// # Example
///
/// ```ignore
/// let prepared = preprocessor.prepare(&jpeg_bytes, &PreprocessParams::default())?;
/// ```
pub trait ImagePreprocessor: Send + Sync {
    /// Decodes, converts to grayscale, boosts contrast, sharpens and resizes
    fn prepare(&self, encoded: &[u8], params: &PreprocessParams)
    -> Result<DynamicImage, PreprocessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(PreprocessParams::default().validate().is_ok());
    }

    #[test]
    fn test_target_width_is_bounded() {
        let params = PreprocessParams::default().with_target_width(640);
        assert!(matches!(
            params.validate(),
            Err(PreprocessError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_non_positive_contrast_is_rejected() {
        let params = PreprocessParams::default().with_contrast(0.0);
        assert!(params.validate().is_err());
    }
}

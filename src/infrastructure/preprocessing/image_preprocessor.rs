//! `image`-crate preprocessor
//!
//! Grayscale, contrast boost, unsharp mask, then resize to the target width.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::domain::repositories::{ImagePreprocessor, PreprocessError, PreprocessParams};

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCratePreprocessor;

impl ImageCratePreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Applies the pipeline to an already decoded image
    pub fn prepare_image(
        &self,
        image: &DynamicImage,
        params: &PreprocessParams,
    ) -> Result<DynamicImage, PreprocessError> {
        params.validate()?;
        if image.width() == 0 || image.height() == 0 {
            return Err(PreprocessError::InvalidParams("image has no pixels".to_string()));
        }

        // adjust_contrast takes a percentage change, not a factor
        let contrast_percent = (params.contrast - 1.0) * 100.0;
        let processed = image
            .grayscale()
            .adjust_contrast(contrast_percent)
            .unsharpen(params.sharpen_sigma, params.sharpen_threshold);

        let scale = params.target_width as f64 / processed.width() as f64;
        let target_height = ((processed.height() as f64 * scale).round() as u32).max(1);

        Ok(processed.resize_exact(params.target_width, target_height, FilterType::Lanczos3))
    }
}

impl ImagePreprocessor for ImageCratePreprocessor {
    fn prepare(
        &self,
        encoded: &[u8],
        params: &PreprocessParams,
    ) -> Result<DynamicImage, PreprocessError> {
        let image = image::load_from_memory(encoded)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            target_width = params.target_width,
            "preprocessing image for OCR"
        );
        self.prepare_image(&image, params)
    }
}

//! OCR engine trait

use image::DynamicImage;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for text recognition engines
///
/// Implementations may block for a long time; sessions run them off the
/// async executor.
///
/// # Example
///
/// ```ignore
/// let engine = TesseractOcrEngine::new("por");
/// let text = engine.recognize(&prepared)?;
/// ```
pub trait OcrEngine: Send + Sync {
    /// Returns the raw recognized text
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

//! Tesseract command-line OCR engine

use image::{DynamicImage, ImageFormat};
use std::process::Command;

use crate::domain::repositories::{OcrEngine, OcrError};

/// Runs the `tesseract` binary on a temporary PNG
///
/// Recognition is restricted to digits and the separators printed between
/// line groups.
pub struct TesseractOcrEngine {
    program: String,
    language: String,
    page_segmentation: u8,
}

impl Default for TesseractOcrEngine {
    fn default() -> Self {
        Self::new("por")
    }
}

impl TesseractOcrEngine {
    pub fn new(language: &str) -> Self {
        Self {
            program: "tesseract".to_string(),
            language: language.to_string(),
            page_segmentation: 6,
        }
    }

    /// Uses a different executable (absolute path or wrapper script)
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn with_page_segmentation(mut self, mode: u8) -> Self {
        self.page_segmentation = mode;
        self
    }

    /// Whether the executable can be started
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }
}

impl OcrEngine for TesseractOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let input = tempfile::Builder::new()
            .prefix("linha-ocr-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| OcrError::ProcessingError(format!("Failed to write temp image: {e}")))?;

        let output = Command::new(&self.program)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.page_segmentation.to_string())
            .arg("-c")
            .arg("tessedit_char_whitelist=0123456789.- ")
            .output()
            .map_err(|e| {
                OcrError::EngineUnavailable(format!("Failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

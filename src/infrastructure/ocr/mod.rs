//! OCR engine implementations

mod tesseract;

pub use tesseract::TesseractOcrEngine;

//! Domain services
//!
//! Recognition strategies: one uniform `attempt` interface over barcode
//! decoding, OCR and typed entry. Extraction, validation and consensus are
//! applied by the session on top of whatever a strategy returns.

mod barcode;
mod manual;
mod ocr;
mod strategy;

pub use barcode::BarcodeStrategy;
pub use manual::ManualEntryStrategy;
pub use ocr::OcrStrategy;
pub use strategy::{Attempt, RawRead, RecognitionStrategy, Signal};

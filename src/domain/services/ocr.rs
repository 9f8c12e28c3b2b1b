//! OCR strategy

use linha_core::{ErrorKind, ReadSource};
use std::sync::Arc;
use std::time::Instant;

use super::strategy::{Attempt, RawRead, RecognitionStrategy, Signal};
use crate::domain::repositories::{ImagePreprocessor, OcrEngine, PreprocessParams};

/// Preprocesses a still image and runs text recognition on it
///
/// Blocking; callers run it on a blocking thread.
pub struct OcrStrategy {
    preprocessor: Arc<dyn ImagePreprocessor>,
    engine: Arc<dyn OcrEngine>,
    params: PreprocessParams,
}

impl OcrStrategy {
    pub fn new(
        preprocessor: Arc<dyn ImagePreprocessor>,
        engine: Arc<dyn OcrEngine>,
        params: PreprocessParams,
    ) -> Self {
        Self {
            preprocessor,
            engine,
            params,
        }
    }

    fn recognize(&self, encoded: &[u8]) -> Attempt {
        let started = Instant::now();

        let prepared = match self.preprocessor.prepare(encoded, &self.params) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "image preprocessing failed");
                return Attempt::Failed(ErrorKind::OcrFailure);
            }
        };

        match self.engine.recognize(&prepared) {
            Ok(text) if text.trim().is_empty() => Attempt::NoReadYet,
            Ok(text) => {
                tracing::info!(
                    chars = text.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "OCR completed"
                );
                Attempt::Read(RawRead::new(text, ReadSource::Ocr, Instant::now()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "OCR engine failed");
                Attempt::Failed(ErrorKind::OcrFailure)
            }
        }
    }
}

impl RecognitionStrategy for OcrStrategy {
    fn source(&self) -> ReadSource {
        ReadSource::Ocr
    }

    fn attempt(&self, signal: &Signal) -> Attempt {
        match signal {
            Signal::Image(bytes) => self.recognize(bytes),
            Signal::Frame(frame) => self.recognize(frame.data()),
            Signal::Typed(_) => {
                tracing::warn!("OCR strategy cannot read typed text");
                Attempt::NoReadYet
            }
        }
    }
}

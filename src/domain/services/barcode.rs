//! Barcode strategy

use linha_core::{ErrorKind, ReadSource};
use std::sync::Arc;

use super::strategy::{Attempt, RawRead, RecognitionStrategy, Signal};
use crate::domain::repositories::{BarcodeDecoder, DecodeError, DecoderConfig};

/// Runs a barcode decoder over live frames
///
/// Cloning shares the decoder, so a copy can run on a blocking thread.
#[derive(Clone)]
pub struct BarcodeStrategy {
    decoder: Arc<dyn BarcodeDecoder>,
    config: DecoderConfig,
}

impl BarcodeStrategy {
    pub fn new(decoder: Arc<dyn BarcodeDecoder>, config: DecoderConfig) -> Self {
        Self { decoder, config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Switches decoder configuration, clearing decoder state first
    pub fn reconfigure(&mut self, config: DecoderConfig) {
        self.decoder.reset();
        self.config = config;
    }

    pub fn reset(&self) {
        self.decoder.reset();
    }
}

impl RecognitionStrategy for BarcodeStrategy {
    fn source(&self) -> ReadSource {
        ReadSource::Barcode
    }

    fn attempt(&self, signal: &Signal) -> Attempt {
        let Signal::Frame(frame) = signal else {
            tracing::warn!(signal = signal.kind(), "barcode strategy only reads frames");
            return Attempt::NoReadYet;
        };

        match self.decoder.decode(frame, &self.config) {
            Ok(Some(text)) => {
                tracing::trace!(sequence = frame.sequence(), %text, "symbol decoded");
                Attempt::Read(RawRead::new(text, ReadSource::Barcode, frame.captured_at()))
            }
            Ok(None) => Attempt::NoReadYet,
            // one corrupt frame is a missed sample, not a broken decoder
            Err(DecodeError::InvalidFrame(reason)) => {
                tracing::debug!(sequence = frame.sequence(), %reason, "undecodable frame skipped");
                Attempt::NoReadYet
            }
            Err(e) => {
                tracing::warn!(sequence = frame.sequence(), error = %e, "barcode decoder failed");
                Attempt::Failed(ErrorKind::DecoderFailure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Frame;

    struct FixedDecoder(fn() -> Result<Option<String>, DecodeError>);

    impl BarcodeDecoder for FixedDecoder {
        fn decode(&self, _: &Frame, _: &DecoderConfig) -> Result<Option<String>, DecodeError> {
            (self.0)()
        }
    }

    fn attempt_with(result: fn() -> Result<Option<String>, DecodeError>) -> Attempt {
        let strategy = BarcodeStrategy::new(Arc::new(FixedDecoder(result)), DecoderConfig::primary());
        strategy.attempt(&Signal::Frame(Frame::new(0, vec![1u8, 2, 3])))
    }

    #[test]
    fn test_corrupt_frame_is_not_a_failure() {
        let attempt = attempt_with(|| Err(DecodeError::InvalidFrame("truncated".to_string())));
        assert_eq!(attempt, Attempt::NoReadYet);
    }

    #[test]
    fn test_engine_error_is_a_failure() {
        let attempt = attempt_with(|| Err(DecodeError::Engine("crashed".to_string())));
        assert_eq!(attempt, Attempt::Failed(ErrorKind::DecoderFailure));
    }

    #[test]
    fn test_decoded_text_is_a_read() {
        match attempt_with(|| Ok(Some("123".to_string()))) {
            Attempt::Read(raw) => {
                assert_eq!(raw.text, "123");
                assert_eq!(raw.source, ReadSource::Barcode);
            }
            other => panic!("expected a read, got {other:?}"),
        }
        assert_eq!(attempt_with(|| Ok(None)), Attempt::NoReadYet);
    }
}

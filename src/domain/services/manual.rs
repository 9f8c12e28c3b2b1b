//! Manual entry strategy

use linha_core::ReadSource;
use std::time::Instant;

use super::strategy::{Attempt, RawRead, RecognitionStrategy, Signal};

/// Passes operator-typed text through unchanged
///
/// Even empty input becomes a read, so the session can reject it with a
/// message instead of waiting silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualEntryStrategy;

impl RecognitionStrategy for ManualEntryStrategy {
    fn source(&self) -> ReadSource {
        ReadSource::Manual
    }

    fn attempt(&self, signal: &Signal) -> Attempt {
        match signal {
            Signal::Typed(text) => {
                Attempt::Read(RawRead::new(text.trim(), ReadSource::Manual, Instant::now()))
            }
            other => {
                tracing::warn!(signal = other.kind(), "manual entry only accepts typed text");
                Attempt::NoReadYet
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_text_is_trimmed() {
        let attempt = ManualEntryStrategy.attempt(&Signal::Typed("  123 \n".into()));
        match attempt {
            Attempt::Read(raw) => {
                assert_eq!(raw.text, "123");
                assert_eq!(raw.source, ReadSource::Manual);
            }
            other => panic!("unexpected attempt {other:?}"),
        }
    }

    #[test]
    fn test_non_text_signal_is_no_read() {
        let signal = Signal::Image(std::sync::Arc::from(vec![1u8, 2, 3]));
        assert_eq!(ManualEntryStrategy.attempt(&signal), Attempt::NoReadYet);
    }
}

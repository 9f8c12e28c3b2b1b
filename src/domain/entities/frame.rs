//! Camera frame entity

use std::sync::Arc;
use std::time::Instant;

/// One encoded image pushed by a capture device.
///
/// The payload is kept encoded (JPEG/PNG) and shared, so handing a frame to
/// the decoder and keeping it as the latest snapshot costs a refcount bump.
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    data: Arc<[u8]>,
    captured_at: Instant,
}

impl Frame {
    /// Creates a frame stamped with the current instant
    pub fn new(sequence: u64, data: impl Into<Arc<[u8]>>) -> Self {
        Self::captured(sequence, data, Instant::now())
    }

    /// Creates a frame with an explicit capture instant
    pub fn captured(sequence: u64, data: impl Into<Arc<[u8]>>, captured_at: Instant) -> Self {
        Self {
            sequence,
            data: data.into(),
            captured_at,
        }
    }

    /// Position of the frame in the device stream
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Encoded image bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the encoded bytes
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

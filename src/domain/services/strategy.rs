//! Recognition strategy trait

use linha_core::{ErrorKind, ReadSource};
use std::sync::Arc;
use std::time::Instant;

use crate::domain::entities::Frame;

/// Input handed to a strategy
#[derive(Debug, Clone)]
pub enum Signal {
    /// Live camera frame
    Frame(Frame),
    /// Encoded still image supplied by the operator
    Image(Arc<[u8]>),
    /// Text typed by the operator
    Typed(String),
}

impl Signal {
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::Frame(_) => "frame",
            Signal::Image(_) => "image",
            Signal::Typed(_) => "typed",
        }
    }
}

/// Unvalidated text produced by one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRead {
    pub text: String,
    pub source: ReadSource,
    pub captured_at: Instant,
}

impl RawRead {
    pub fn new(text: impl Into<String>, source: ReadSource, captured_at: Instant) -> Self {
        Self {
            text: text.into(),
            source,
            captured_at,
        }
    }
}

/// Result of one recognition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Read(RawRead),
    /// Nothing recognizable in this input; keep sampling
    NoReadYet,
    /// The engine itself failed
    Failed(ErrorKind),
}

/// A way of turning a signal into raw text
///
/// Strategies never validate; they only report what their engine saw.
///
/// # Example
///
/// ```ignore
/// match strategy.attempt(&Signal::Frame(frame)) {
///     Attempt::Read(raw) => extract(&raw.text, raw.source, raw.captured_at),
///     Attempt::NoReadYet => Vec::new(),
///     Attempt::Failed(kind) => return Err(kind),
/// };
/// ```
pub trait RecognitionStrategy: Send + Sync {
    /// Source tag attached to every read this strategy produces
    fn source(&self) -> ReadSource;

    fn attempt(&self, signal: &Signal) -> Attempt;
}

//! Session outcome entity

use linha_core::{DigitLine, ErrorKind};
use serde::Serialize;

/// How an acquisition session ended. Exactly one is delivered per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SessionOutcome {
    Success(DigitLine),
    Failed(ErrorKind),
    Cancelled,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success(_))
    }

    /// The confirmed line, if the session succeeded
    pub fn line(&self) -> Option<&DigitLine> {
        match self {
            SessionOutcome::Success(line) => Some(line),
            _ => None,
        }
    }

    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionOutcome::Success(_) => 0,
            SessionOutcome::Failed(_) => 1,
            SessionOutcome::Cancelled => 130,
        }
    }
}

use serde::Serialize;
use thiserror::Error;

use crate::checksum::ChecksumError;

/// Outcome classification shared by every stage of the acquisition pipeline.
///
/// Only `DeviceUnavailable` and `AllStrategiesExhausted` ever end a session;
/// everything else is handled where it happens and sampling continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("digit count is not 44, 47 or 48")]
    InvalidLength,

    #[error("check digits do not match")]
    ChecksumMismatch,

    #[error("no barcode symbol detected")]
    NoSymbolDetected,

    #[error("no read yet")]
    NoReadYet,

    #[error("capture device unavailable")]
    DeviceUnavailable,

    #[error("consecutive reads disagree")]
    AmbiguousRead,

    #[error("all recognition strategies exhausted")]
    AllStrategiesExhausted,

    #[error("barcode decoder failed")]
    DecoderFailure,

    #[error("text recognition failed")]
    OcrFailure,
}

impl ErrorKind {
    /// Kinds that may end a session as `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ErrorKind::DeviceUnavailable | ErrorKind::AllStrategiesExhausted
        )
    }
}

impl From<ChecksumError> for ErrorKind {
    fn from(err: ChecksumError) -> Self {
        match err {
            ChecksumError::InvalidLength(_) | ChecksumError::NonDigit(_) => {
                ErrorKind::InvalidLength
            }
            ChecksumError::BlockMismatch { .. } | ChecksumError::OverallMismatch { .. } => {
                ErrorKind::ChecksumMismatch
            }
        }
    }
}

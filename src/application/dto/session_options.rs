//! Session options DTO

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

use crate::domain::repositories::{DecoderConfig, PreprocessParams};
use linha_core::consensus::{DEFAULT_DEPTH, MIN_DEPTH};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config: {0}")]
    Io(#[from] io::Error),

    #[error("Could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Options for one acquisition session
///
/// Loadable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Time each barcode phase gets before the session moves on
    pub attempt_budget_ms: u64,
    /// Reads retained by the consensus buffer (2 or 3)
    pub consensus_depth: usize,
    pub primary_decoder: DecoderConfig,
    /// Second barcode pass with a narrower configuration, if any
    pub secondary_decoder: Option<DecoderConfig>,
    pub preprocess: PreprocessParams,
    /// Run OCR on the last camera frame when barcode scanning gives up
    pub snapshot_ocr: bool,
    /// Turn the torch on while the camera is held
    pub torch: bool,
    /// Capacity of the frame channel between device and session
    pub frame_buffer: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            attempt_budget_ms: 10_000,
            consensus_depth: DEFAULT_DEPTH,
            primary_decoder: DecoderConfig::primary(),
            secondary_decoder: None,
            preprocess: PreprocessParams::default(),
            snapshot_ocr: false,
            torch: false,
            frame_buffer: 16,
        }
    }
}

impl SessionOptions {
    /// Loads options from a JSON file and validates them
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&text)?;
        options.validate()?;
        Ok(options)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.attempt_budget_ms)
    }

    /// Sets the per-phase time budget
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.attempt_budget_ms = budget.as_millis() as u64;
        self
    }

    /// Sets the consensus depth
    pub fn with_consensus_depth(mut self, depth: usize) -> Self {
        self.consensus_depth = depth;
        self
    }

    /// Enables a secondary barcode pass
    pub fn with_secondary_decoder(mut self, config: DecoderConfig) -> Self {
        self.secondary_decoder = Some(config);
        self
    }

    /// Enables OCR on the last frame when barcode scanning gives up
    pub fn with_snapshot_ocr(mut self, enabled: bool) -> Self {
        self.snapshot_ocr = enabled;
        self
    }

    pub fn with_torch(mut self, enabled: bool) -> Self {
        self.torch = enabled;
        self
    }

    pub fn with_preprocess(mut self, params: PreprocessParams) -> Self {
        self.preprocess = params;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt_budget_ms == 0 {
            return Err(ConfigError::Invalid("attempt budget must be positive".into()));
        }
        if !(MIN_DEPTH..=DEFAULT_DEPTH).contains(&self.consensus_depth) {
            return Err(ConfigError::Invalid(format!(
                "consensus depth {} outside {MIN_DEPTH}..={DEFAULT_DEPTH}",
                self.consensus_depth
            )));
        }
        if self.frame_buffer == 0 {
            return Err(ConfigError::Invalid("frame buffer must hold at least one frame".into()));
        }
        for config in std::iter::once(&self.primary_decoder).chain(&self.secondary_decoder) {
            if config.symbologies.is_empty() {
                return Err(ConfigError::Invalid("decoder needs at least one symbology".into()));
            }
            if config.region.is_some_and(|roi| !roi.is_valid()) {
                return Err(ConfigError::Invalid("decoder region outside the frame".into()));
            }
        }
        self.preprocess
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.budget(), Duration::from_secs(10));
        assert_eq!(options.consensus_depth, 3);
        assert!(options.secondary_decoder.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"attempt_budget_ms": 2500, "torch": true}"#).unwrap();
        assert_eq!(options.budget(), Duration::from_millis(2500));
        assert!(options.torch);
        assert_eq!(options.frame_buffer, 16);
    }

    #[test]
    fn test_zero_budget_is_invalid() {
        let options = SessionOptions::default().with_budget(Duration::ZERO);
        assert!(matches!(options.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_depth_out_of_range_is_invalid() {
        let options = SessionOptions::default().with_consensus_depth(5);
        assert!(options.validate().is_err());
    }
}

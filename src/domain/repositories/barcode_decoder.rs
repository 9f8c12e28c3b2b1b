//! Barcode decoder trait

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

use crate::domain::entities::Frame;

/// Errors reported by a barcode decoder
///
/// "No symbol in this frame" is not an error; it is `Ok(None)`.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Decoder engine failure: {0}")]
    Engine(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Symbologies a decoder may be asked to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    /// Interleaved 2 of 5, the symbology printed on boletos
    Interleaved2of5,
    Code128,
    Ean13,
    QrCode,
}

/// Normalized region of a frame, all fields in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RegionOfInterest {
    /// Horizontal band across the middle of the frame
    pub fn center_band() -> Self {
        Self {
            x: 0.0,
            y: 0.3,
            width: 1.0,
            height: 0.4,
        }
    }

    pub fn is_valid(&self) -> bool {
        let unit = 0.0..=1.0;
        unit.contains(&self.x)
            && unit.contains(&self.y)
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + f32::EPSILON
            && self.y + self.height <= 1.0 + f32::EPSILON
    }

    /// Converts to a pixel rectangle `(x, y, width, height)` clipped to the image
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> (u32, u32, u32, u32) {
        if image_width == 0 || image_height == 0 {
            return (0, 0, 0, 0);
        }
        let x = ((self.x * image_width as f32) as u32).min(image_width.saturating_sub(1));
        let y = ((self.y * image_height as f32) as u32).min(image_height.saturating_sub(1));
        let w = ((self.width * image_width as f32) as u32).clamp(1, image_width - x);
        let h = ((self.height * image_height as f32) as u32).clamp(1, image_height - y);
        (x, y, w, h)
    }
}

/// What a decoder should look for, and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub symbologies: Vec<Symbology>,
    #[serde(default)]
    pub region: Option<RegionOfInterest>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::primary()
    }
}

impl DecoderConfig {
    /// Broad configuration: every supported symbology over the full frame
    pub fn primary() -> Self {
        Self {
            symbologies: vec![
                Symbology::Interleaved2of5,
                Symbology::Code128,
                Symbology::Ean13,
                Symbology::QrCode,
            ],
            region: None,
        }
    }

    /// Narrow configuration: Interleaved 2 of 5 inside the center band
    pub fn focused() -> Self {
        Self {
            symbologies: vec![Symbology::Interleaved2of5],
            region: Some(RegionOfInterest::center_band()),
        }
    }
}

/// Trait for barcode decoding engines
///
/// # Example
///
/// ```ignore
/// let decoder = ZbarBarcodeDecoder::new();
/// if let Some(text) = decoder.decode(&frame, &DecoderConfig::primary())? {
///     println!("decoded {text}");
/// }
/// ```
pub trait BarcodeDecoder: Send + Sync {
    /// Decodes one frame. `Ok(None)` when no symbol was found.
    fn decode(&self, frame: &Frame, config: &DecoderConfig) -> Result<Option<String>, DecodeError>;

    /// Clears any per-stream state. Called on phase switches.
    fn reset(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_band_pixels() {
        let roi = RegionOfInterest::center_band();
        assert!(roi.is_valid());
        assert_eq!(roi.to_pixels(1000, 500), (0, 150, 1000, 200));
    }

    #[test]
    fn test_region_outside_unit_square_is_invalid() {
        let roi = RegionOfInterest {
            x: 0.8,
            y: 0.0,
            width: 0.5,
            height: 1.0,
        };
        assert!(!roi.is_valid());
    }

    #[test]
    fn test_configs_deserialize_without_region() {
        let json = r#"{"symbologies":["interleaved2of5"]}"#;
        let config: DecoderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.symbologies, vec![Symbology::Interleaved2of5]);
        assert!(config.region.is_none());
    }
}

//! zbar command-line barcode decoder

use image::ImageFormat;
use std::process::Command;

use crate::domain::entities::Frame;
use crate::domain::repositories::{BarcodeDecoder, DecodeError, DecoderConfig, Symbology};

/// `zbarimg` exits with this status when the image holds no symbol
const EXIT_NO_SYMBOL: i32 = 4;

fn zbar_name(symbology: Symbology) -> &'static str {
    match symbology {
        Symbology::Interleaved2of5 => "i25",
        Symbology::Code128 => "code128",
        Symbology::Ean13 => "ean13",
        Symbology::QrCode => "qrcode",
    }
}

/// Decodes frames by running `zbarimg` on a temporary PNG
///
/// Stateless between frames, so `reset` has nothing to clear.
pub struct ZbarBarcodeDecoder {
    program: String,
}

impl Default for ZbarBarcodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZbarBarcodeDecoder {
    pub fn new() -> Self {
        Self {
            program: "zbarimg".to_string(),
        }
    }

    /// Uses a different executable (absolute path or wrapper script)
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn symbology_args(config: &DecoderConfig) -> Vec<String> {
        let mut args = vec!["-Sdisable".to_string()];
        args.extend(
            config
                .symbologies
                .iter()
                .map(|s| format!("-S{}.enable", zbar_name(*s))),
        );
        args
    }
}

impl BarcodeDecoder for ZbarBarcodeDecoder {
    fn decode(&self, frame: &Frame, config: &DecoderConfig) -> Result<Option<String>, DecodeError> {
        let mut image = image::load_from_memory(frame.data())
            .map_err(|e| DecodeError::InvalidFrame(e.to_string()))?;

        if let Some(region) = config.region {
            let (x, y, width, height) = region.to_pixels(image.width(), image.height());
            image = image.crop_imm(x, y, width, height);
        }

        let input = tempfile::Builder::new()
            .prefix("linha-frame-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| DecodeError::Engine(format!("Failed to write temp frame: {e}")))?;

        let output = Command::new(&self.program)
            .arg("--quiet")
            .arg("--raw")
            .args(Self::symbology_args(config))
            .arg(input.path())
            .output()
            .map_err(|e| DecodeError::Engine(format!("Failed to run {}: {e}", self.program)))?;

        if output.status.code() == Some(EXIT_NO_SYMBOL) {
            return Ok(None);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DecodeError::Engine(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbology_args_disable_everything_else() {
        let args = ZbarBarcodeDecoder::symbology_args(&DecoderConfig::focused());
        assert_eq!(args, vec!["-Sdisable", "-Si25.enable"]);
    }

    #[test]
    fn test_undecodable_frame_is_invalid() {
        let decoder = ZbarBarcodeDecoder::new();
        let frame = Frame::new(0, vec![0u8, 1, 2, 3]);
        assert!(matches!(
            decoder.decode(&frame, &DecoderConfig::primary()),
            Err(DecodeError::InvalidFrame(_))
        ));
    }
}

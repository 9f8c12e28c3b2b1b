//! Repository traits (interfaces)
//!
//! Contracts for the hardware and engines an acquisition session drives.
//! Concrete adapters live in the infrastructure layer; tests use fakes.

mod barcode_decoder;
mod capture_device;
mod image_preprocessor;
mod ocr_engine;

pub use barcode_decoder::{BarcodeDecoder, DecodeError, DecoderConfig, RegionOfInterest, Symbology};
pub use capture_device::{CaptureDevice, DeviceError, DeviceHandle};
pub use image_preprocessor::{ImagePreprocessor, PreprocessError, PreprocessParams};
pub use ocr_engine::{OcrEngine, OcrError};

//! Infrastructure layer
//!
//! Concrete implementations of the domain repositories. This layer holds
//! everything that touches files, external programs or image codecs.

pub mod barcode;
pub mod capture;
pub mod ocr;
pub mod preprocessing;

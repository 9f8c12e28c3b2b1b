//! Barcode decoder implementations

mod zbar;

pub use zbar::ZbarBarcodeDecoder;

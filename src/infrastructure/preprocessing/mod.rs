//! Image preprocessing implementations

mod image_preprocessor;

pub use image_preprocessor::ImageCratePreprocessor;

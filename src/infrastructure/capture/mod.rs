//! Capture device implementations

mod directory;

pub use directory::DirectoryCaptureDevice;

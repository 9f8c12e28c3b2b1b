//! Capture device trait
//!
//! Defines the interface for exclusive access to a camera (or anything that
//! can stand in for one) and its frame stream.

use std::io;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::entities::Frame;

/// Errors that can occur when acquiring or streaming from a capture device
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device is busy: {0}")]
    DeviceBusy(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Unknown device handle {0}")]
    UnknownHandle(u64),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Opaque token for an acquired device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u64);

impl DeviceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Trait for exclusive camera access
///
/// A session acquires the device once, subscribes a bounded channel to its
/// frames and releases it exactly once when it leaves the camera phase.
///
/// # Example
///
/// ```ignore
/// let handle = device.acquire()?;
/// let (tx, mut rx) = tokio::sync::mpsc::channel(16);
/// device.subscribe_frames(&handle, tx)?;
/// while let Some(frame) = rx.recv().await { /* decode */ }
/// device.release(Some(handle));
/// ```
pub trait CaptureDevice: Send + Sync {
    /// Takes exclusive ownership of the device
    fn acquire(&self) -> Result<DeviceHandle, DeviceError>;

    /// Starts pushing frames into `frames` until the device is released or
    /// the receiver is dropped
    fn subscribe_frames(
        &self,
        handle: &DeviceHandle,
        frames: mpsc::Sender<Frame>,
    ) -> Result<(), DeviceError>;

    /// Switches the torch. Devices without one accept and ignore the call.
    fn set_torch(&self, handle: &DeviceHandle, on: bool) -> Result<(), DeviceError> {
        let _ = (handle, on);
        Ok(())
    }

    /// Releases the device
    ///
    /// Must be idempotent. `None` is passed when acquisition never produced
    /// a handle, so partially opened resources can still be cleaned up.
    fn release(&self, handle: Option<DeviceHandle>);
}

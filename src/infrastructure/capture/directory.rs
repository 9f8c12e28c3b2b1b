//! Directory-backed capture device
//!
//! Replays the image files of a directory, in name order, as a frame stream.
//! Stands in for a camera on machines without one and in tests.

use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::entities::Frame;
use crate::domain::repositories::{CaptureDevice, DeviceError, DeviceHandle};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// How often a blocked sender re-checks for release
const FULL_CHANNEL_POLL: Duration = Duration::from_millis(10);

struct ActiveStream {
    handle: DeviceHandle,
    files: Vec<PathBuf>,
    stop: Arc<AtomicBool>,
    subscribed: bool,
    torch: bool,
}

pub struct DirectoryCaptureDevice {
    directory: PathBuf,
    interval: Duration,
    repeat: bool,
    next_id: AtomicU64,
    active: Mutex<Option<ActiveStream>>,
}

impl DirectoryCaptureDevice {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            interval: Duration::from_millis(100),
            repeat: false,
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }
    }

    /// Delay between frames
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Loops over the files until released instead of ending the stream
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether the device is currently held
    pub fn is_acquired(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn torch_on(&self) -> bool {
        self.active.lock().as_ref().is_some_and(|a| a.torch)
    }

    fn frame_files(&self) -> Result<Vec<PathBuf>, DeviceError> {
        let entries = fs::read_dir(&self.directory).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DeviceError::DeviceNotFound(self.directory.display().to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                DeviceError::PermissionDenied(self.directory.display().to_string())
            }
            _ => DeviceError::IoError(e),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_frame && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Hands one frame to the session, waiting while the channel is full.
///
/// Returns `false` once the device was released or the receiver is gone.
fn deliver(frames: &mpsc::Sender<Frame>, mut frame: Frame, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        match frames.try_send(frame) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                frame = back;
                thread::sleep(FULL_CHANNEL_POLL);
            }
            Err(TrySendError::Closed(_)) => return false,
        }
    }
}

fn replay(
    files: Vec<PathBuf>,
    frames: mpsc::Sender<Frame>,
    stop: Arc<AtomicBool>,
    interval: Duration,
    repeat: bool,
) {
    let mut sequence = 0u64;
    loop {
        for path in &files {
            if stop.load(Ordering::Acquire) {
                return;
            }
            let data = match fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable frame");
                    continue;
                }
            };
            if !deliver(&frames, Frame::new(sequence, data), &stop) {
                return;
            }
            sequence += 1;
            thread::sleep(interval);
        }
        if !repeat {
            tracing::debug!(frames = sequence, "frame directory exhausted");
            return;
        }
    }
}

impl CaptureDevice for DirectoryCaptureDevice {
    fn acquire(&self) -> Result<DeviceHandle, DeviceError> {
        let mut active = self.active.lock();
        if active.is_some() {
            return Err(DeviceError::DeviceBusy(self.directory.display().to_string()));
        }

        let files = self.frame_files()?;
        if files.is_empty() {
            return Err(DeviceError::DeviceNotFound(format!(
                "no image frames in {}",
                self.directory.display()
            )));
        }

        let handle = DeviceHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(handle = handle.id(), frames = files.len(), "frame directory opened");
        *active = Some(ActiveStream {
            handle,
            files,
            stop: Arc::new(AtomicBool::new(false)),
            subscribed: false,
            torch: false,
        });
        Ok(handle)
    }

    fn subscribe_frames(
        &self,
        handle: &DeviceHandle,
        frames: mpsc::Sender<Frame>,
    ) -> Result<(), DeviceError> {
        let mut guard = self.active.lock();
        let stream = guard
            .as_mut()
            .filter(|a| a.handle == *handle)
            .ok_or(DeviceError::UnknownHandle(handle.id()))?;
        if stream.subscribed {
            return Err(DeviceError::StreamError("already subscribed".to_string()));
        }

        let files = stream.files.clone();
        let stop = Arc::clone(&stream.stop);
        let (interval, repeat) = (self.interval, self.repeat);
        thread::Builder::new()
            .name("linha-frames".to_string())
            .spawn(move || replay(files, frames, stop, interval, repeat))?;
        stream.subscribed = true;
        Ok(())
    }

    fn set_torch(&self, handle: &DeviceHandle, on: bool) -> Result<(), DeviceError> {
        let mut guard = self.active.lock();
        let stream = guard
            .as_mut()
            .filter(|a| a.handle == *handle)
            .ok_or(DeviceError::UnknownHandle(handle.id()))?;
        stream.torch = on;
        Ok(())
    }

    fn release(&self, handle: Option<DeviceHandle>) {
        let Some(handle) = handle else {
            tracing::debug!("release without a handle: nothing was opened");
            return;
        };

        let mut guard = self.active.lock();
        if guard.as_ref().is_some_and(|a| a.handle == handle) {
            if let Some(stream) = guard.take() {
                stream.stop.store(true, Ordering::Release);
            }
            tracing::debug!(handle = handle.id(), "frame directory released");
        }
    }
}

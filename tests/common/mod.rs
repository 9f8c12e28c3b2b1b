//! Shared fakes for session and orchestrator tests
#![allow(dead_code)]

use image::DynamicImage;
use linha::application::{AcquisitionService, AcquisitionState, SessionListener};
use linha::domain::entities::Frame;
use linha::domain::repositories::{
    BarcodeDecoder, CaptureDevice, DecodeError, DecoderConfig, DeviceError, DeviceHandle,
    ImagePreprocessor, OcrEngine, OcrError, PreprocessError, PreprocessParams,
};
use linha::{DigitLine, ErrorKind, SessionOptions};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Printed line whose block and overall check digits all match
pub const VALID_LINE: &str = "34191790010104351004791020150008184410026000000";

/// 44-digit partial read; two of them concatenate to a valid 48-digit line
pub const PARTIAL: &str = "52601815988301661318009139099601182462819480";
pub const PARTIAL_CONFIRMED: &str = "526018159883016613180091390996011824628194805260";

/// Decoder text that makes the scripted decoder fail
pub const DECODER_ERROR: &str = "ERR";

/// Frame the scripted decoder cannot parse as an image
pub const CORRUPT_FRAME: &str = "BAD";

/// Ordered record of everything the fakes and the listener saw
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

pub fn position(journal: &Journal, entry: &str) -> Option<usize> {
    journal.lock().iter().position(|e| e == entry)
}

// ============================================================================
// Capture device
// ============================================================================

/// Frames carry the text the scripted decoder will "decode"
pub fn text_frames(texts: &[&str]) -> Vec<Frame> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Frame::new(i as u64, t.as_bytes().to_vec()))
        .collect()
}

pub struct FakeDevice {
    journal: Journal,
    frames: Vec<Frame>,
    fail_acquire: bool,
    sender: Mutex<Option<mpsc::Sender<Frame>>>,
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
}

impl FakeDevice {
    pub fn new(journal: Journal, frames: Vec<Frame>) -> Self {
        Self {
            journal,
            frames,
            fail_acquire: false,
            sender: Mutex::new(None),
            acquires: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(journal: Journal) -> Self {
        Self {
            fail_acquire: true,
            ..Self::new(journal, Vec::new())
        }
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for FakeDevice {
    fn acquire(&self) -> Result<DeviceHandle, DeviceError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push("acquire".to_string());
        if self.fail_acquire {
            return Err(DeviceError::PermissionDenied("camera".to_string()));
        }
        Ok(DeviceHandle::new(7))
    }

    fn subscribe_frames(
        &self,
        _handle: &DeviceHandle,
        frames: mpsc::Sender<Frame>,
    ) -> Result<(), DeviceError> {
        for frame in &self.frames {
            frames
                .try_send(frame.clone())
                .map_err(|e| DeviceError::StreamError(e.to_string()))?;
        }
        // keep the stream open until release, like a live camera
        *self.sender.lock() = Some(frames);
        Ok(())
    }

    fn set_torch(&self, _handle: &DeviceHandle, on: bool) -> Result<(), DeviceError> {
        let entry = if on { "torch:on" } else { "torch:off" };
        self.journal.lock().push(entry.to_string());
        Ok(())
    }

    fn release(&self, handle: Option<DeviceHandle>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.sender.lock().take();
        let entry = match handle {
            Some(_) => "release",
            None => "release:none",
        };
        self.journal.lock().push(entry.to_string());
    }
}

// ============================================================================
// Decoder, preprocessor, OCR
// ============================================================================

/// Treats the frame bytes as the decoded text
#[derive(Default)]
pub struct ScriptedDecoder {
    pub configs: Mutex<Vec<DecoderConfig>>,
    pub resets: AtomicUsize,
    pub decodes: AtomicUsize,
    delay: Duration,
}

impl ScriptedDecoder {
    /// Blocks for `delay` on every frame, like an external decoder process
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

impl BarcodeDecoder for ScriptedDecoder {
    fn decode(&self, frame: &Frame, config: &DecoderConfig) -> Result<Option<String>, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        {
            let mut configs = self.configs.lock();
            if configs.last() != Some(config) {
                configs.push(config.clone());
            }
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let text = String::from_utf8_lossy(frame.data()).into_owned();
        match text.as_str() {
            "" => Ok(None),
            DECODER_ERROR => Err(DecodeError::Engine("scripted failure".to_string())),
            CORRUPT_FRAME => Err(DecodeError::InvalidFrame("truncated image".to_string())),
            _ => Ok(Some(text)),
        }
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records the encoded bytes it was given and returns a tiny blank image
#[derive(Default)]
pub struct RecordingPreprocessor {
    pub inputs: Mutex<Vec<Vec<u8>>>,
}

impl ImagePreprocessor for RecordingPreprocessor {
    fn prepare(
        &self,
        encoded: &[u8],
        _params: &PreprocessParams,
    ) -> Result<DynamicImage, PreprocessError> {
        self.inputs.lock().push(encoded.to_vec());
        Ok(DynamicImage::new_luma8(4, 4))
    }
}

/// Returns the scripted texts in order, then the last one forever
pub struct ScriptedOcr {
    texts: Mutex<Vec<Result<String, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedOcr {
    pub fn returning(text: &str) -> Self {
        Self::sequence(vec![Ok(text.to_string())])
    }

    pub fn sequence(texts: Vec<Result<String, String>>) -> Self {
        Self {
            texts: Mutex::new(texts),
            calls: AtomicUsize::new(0),
        }
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut texts = self.texts.lock();
        let next = if texts.len() > 1 {
            texts.remove(0)
        } else {
            texts.first().cloned().unwrap_or_else(|| Ok(String::new()))
        };
        next.map_err(OcrError::ProcessingError)
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Writes every callback to the journal and forwards states to the test
pub struct RecordingListener {
    journal: Journal,
    states: mpsc::UnboundedSender<AcquisitionState>,
}

impl RecordingListener {
    pub fn new(journal: Journal) -> (Self, mpsc::UnboundedReceiver<AcquisitionState>) {
        let (states, rx) = mpsc::unbounded_channel();
        (Self { journal, states }, rx)
    }
}

impl SessionListener for RecordingListener {
    fn on_result(&self, line: &DigitLine) {
        self.journal.lock().push(format!("result:{line}"));
    }

    fn on_error(&self, kind: ErrorKind) {
        self.journal.lock().push(format!("error:{kind:?}"));
    }

    fn on_cancelled(&self) {
        self.journal.lock().push("cancelled".to_string());
    }

    fn on_notice(&self, message: &str) {
        self.journal.lock().push(format!("notice:{message}"));
    }

    fn on_state(&self, state: AcquisitionState) {
        self.journal.lock().push(format!("state:{state}"));
        let _ = self.states.send(state);
    }
}

/// Waits until `target` is reported; panics if the session closes first
pub async fn wait_for_state(
    states: &mut mpsc::UnboundedReceiver<AcquisitionState>,
    target: AcquisitionState,
) {
    let reached = tokio::time::timeout(Duration::from_secs(30), async {
        while let Some(state) = states.recv().await {
            if state == target {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);
    assert!(reached, "session never reached {target}");
}

// ============================================================================
// Service wiring
// ============================================================================

pub struct Harness {
    pub journal: Journal,
    pub device: Arc<FakeDevice>,
    pub decoder: Arc<ScriptedDecoder>,
    pub preprocessor: Arc<RecordingPreprocessor>,
    pub ocr: Arc<ScriptedOcr>,
    pub service: AcquisitionService,
}

impl Harness {
    pub fn new(device: FakeDevice, journal: Journal, ocr: ScriptedOcr, options: SessionOptions) -> Self {
        Self::with_decoder(device, journal, ScriptedDecoder::default(), ocr, options)
    }

    pub fn with_decoder(
        device: FakeDevice,
        journal: Journal,
        decoder: ScriptedDecoder,
        ocr: ScriptedOcr,
        options: SessionOptions,
    ) -> Self {
        let device = Arc::new(device);
        let decoder = Arc::new(decoder);
        let preprocessor = Arc::new(RecordingPreprocessor::default());
        let ocr = Arc::new(ocr);
        let service = AcquisitionService::new(
            device.clone(),
            decoder.clone(),
            preprocessor.clone(),
            ocr.clone(),
            options,
        )
        .expect("valid options");
        Self {
            journal,
            device,
            decoder,
            preprocessor,
            ocr,
            service,
        }
    }

    /// Device streaming `texts` as frames, OCR returning nothing
    pub fn with_frames(texts: &[&str], options: SessionOptions) -> Self {
        let journal = journal();
        let device = FakeDevice::new(journal.clone(), text_frames(texts));
        Self::new(device, journal, ScriptedOcr::returning(""), options)
    }
}

pub fn test_options() -> SessionOptions {
    SessionOptions {
        frame_buffer: 64,
        ..SessionOptions::default()
    }
}

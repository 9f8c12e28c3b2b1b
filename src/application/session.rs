//! Async session driver
//!
//! One tokio task per session. Frames, operator commands, device acquisition,
//! barcode and OCR completion and the budget timer are all awaited in a single
//! `select!` loop; each wakeup becomes a [`SessionEvent`] for the machine, and
//! the returned effects are executed in order before the next wakeup.
//!
//! Decoders and OCR engines block, so they run on the blocking pool. At most
//! one frame is being decoded at a time; the next frame is only taken once
//! the previous result is in.

use linha_core::{DigitLine, ErrorKind, ReadSource};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::application::dto::SessionOptions;
use crate::application::orchestrator::{
    AcquisitionMachine, AcquisitionState, Effect, ScanPhase, SessionEvent,
};
use crate::domain::entities::{Frame, SessionOutcome};
use crate::domain::repositories::{
    BarcodeDecoder, CaptureDevice, DeviceError, DeviceHandle, ImagePreprocessor, OcrEngine,
};
use crate::domain::services::{
    Attempt, BarcodeStrategy, ManualEntryStrategy, OcrStrategy, RecognitionStrategy, Signal,
};

/// Receives session notifications
///
/// Exactly one of `on_result`, `on_error` or `on_cancelled` is called per
/// session, after the device has been released.
pub trait SessionListener: Send + 'static {
    fn on_result(&self, line: &DigitLine);

    fn on_error(&self, kind: ErrorKind);

    fn on_cancelled(&self);

    /// Actionable message for the operator (fallback prompts, rejections)
    fn on_notice(&self, message: &str) {
        let _ = message;
    }

    fn on_state(&self, state: AcquisitionState) {
        let _ = state;
    }
}

/// The session already finished and no longer takes commands
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("session is closed")]
pub struct SessionClosed;

#[derive(Debug)]
pub(crate) enum SessionCommand {
    SubmitImage(Arc<[u8]>),
    SubmitManualEntry(String),
    RequestManualEntry,
    DeclineManualEntry,
    Cancel,
}

/// Cloneable sender side of a session's command channel
#[derive(Debug, Clone)]
pub struct SessionControl {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionControl {
    pub(crate) fn new(commands: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { commands }
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(command).map_err(|_| SessionClosed)
    }

    /// Submits a still photo (JPEG/PNG bytes) for OCR
    pub fn submit_image(&self, encoded: Vec<u8>) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SubmitImage(Arc::from(encoded)))
    }

    /// Submits typed text; switches to manual entry if needed
    pub fn submit_manual_entry(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionCommand::SubmitManualEntry(text.into()))
    }

    pub fn request_manual_entry(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::RequestManualEntry)
    }

    /// Gives up on manual entry, ending the session with
    /// `AllStrategiesExhausted`
    pub fn decline_manual_entry(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::DeclineManualEntry)
    }

    pub fn cancel(&self) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Cancel)
    }
}

/// Handle to a running session
///
/// Dropping every control without cancelling cancels the session.
pub struct SessionHandle {
    control: SessionControl,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub(crate) fn new(control: SessionControl, task: JoinHandle<SessionOutcome>) -> Self {
        Self { control, task }
    }

    pub fn control(&self) -> SessionControl {
        self.control.clone()
    }

    pub fn submit_image(&self, encoded: Vec<u8>) -> Result<(), SessionClosed> {
        self.control.submit_image(encoded)
    }

    pub fn submit_manual_entry(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.control.submit_manual_entry(text)
    }

    pub fn request_manual_entry(&self) -> Result<(), SessionClosed> {
        self.control.request_manual_entry()
    }

    pub fn decline_manual_entry(&self) -> Result<(), SessionClosed> {
        self.control.decline_manual_entry()
    }

    pub fn cancel(&self) -> Result<(), SessionClosed> {
        self.control.cancel()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to close
    pub async fn join(self) -> SessionOutcome {
        // the control stays alive until the task ends so joining never cancels
        let Self { control, task } = self;
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "session task aborted");
                SessionOutcome::Cancelled
            }
        };
        drop(control);
        outcome
    }
}

/// Collaborators a session drives
#[derive(Clone)]
pub struct Collaborators {
    pub device: Arc<dyn CaptureDevice>,
    pub decoder: Arc<dyn BarcodeDecoder>,
    pub preprocessor: Arc<dyn ImagePreprocessor>,
    pub ocr_engine: Arc<dyn OcrEngine>,
}

/// Exclusive hold on the capture device
///
/// Releases exactly once: through [`DeviceLease::release`] or, failing that,
/// on drop. The torch is switched off first.
struct DeviceLease {
    device: Arc<dyn CaptureDevice>,
    handle: Option<DeviceHandle>,
    torch_on: bool,
    released: bool,
}

impl DeviceLease {
    fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            handle: None,
            torch_on: false,
            released: false,
        }
    }

    fn attach(&mut self, handle: DeviceHandle) {
        self.handle = Some(handle);
    }

    fn torch(&mut self, on: bool) {
        let Some(handle) = self.handle else {
            return;
        };
        match self.device.set_torch(&handle, on) {
            Ok(()) => self.torch_on = on,
            Err(e) => tracing::warn!(error = %e, on, "could not switch torch"),
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if self.torch_on {
            self.torch(false);
        }
        self.device.release(self.handle);
        self.released = true;
        tracing::info!(handle = ?self.handle.map(|h| h.id()), "capture device released");
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.release();
    }
}

async fn await_slot<T>(slot: &mut Option<JoinHandle<T>>) -> Result<T, tokio::task::JoinError> {
    match slot.as_mut() {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<(Instant, u64)>) -> u64 {
    match deadline {
        Some((at, generation)) => {
            time::sleep_until(at).await;
            generation
        }
        None => std::future::pending().await,
    }
}

pub(crate) struct SessionDriver<L: SessionListener> {
    collaborators: Collaborators,
    options: SessionOptions,
    listener: L,
    machine: AcquisitionMachine,
    lease: DeviceLease,
    barcode: BarcodeStrategy,
    ocr: Arc<OcrStrategy>,
    manual: ManualEntryStrategy,
    acquiring: Option<JoinHandle<Result<DeviceHandle, DeviceError>>>,
    decode_task: Option<JoinHandle<Attempt>>,
    ocr_task: Option<JoinHandle<Attempt>>,
    deadline: Option<(Instant, u64)>,
    frames: mpsc::Receiver<Frame>,
    frame_sender: Option<mpsc::Sender<Frame>>,
    frames_open: bool,
    last_frame: Option<Frame>,
    outcome: Option<SessionOutcome>,
    states_seen: usize,
}

impl<L: SessionListener> SessionDriver<L> {
    pub(crate) fn new(collaborators: Collaborators, options: SessionOptions, listener: L) -> Self {
        let (frame_sender, frames) = mpsc::channel(options.frame_buffer.max(1));
        let barcode = BarcodeStrategy::new(
            Arc::clone(&collaborators.decoder),
            options.primary_decoder.clone(),
        );
        let ocr = Arc::new(OcrStrategy::new(
            Arc::clone(&collaborators.preprocessor),
            Arc::clone(&collaborators.ocr_engine),
            options.preprocess.clone(),
        ));
        Self {
            lease: DeviceLease::new(Arc::clone(&collaborators.device)),
            machine: AcquisitionMachine::new(&options),
            collaborators,
            options,
            listener,
            barcode,
            ocr,
            manual: ManualEntryStrategy,
            acquiring: None,
            decode_task: None,
            ocr_task: None,
            deadline: None,
            frames,
            frame_sender: Some(frame_sender),
            frames_open: true,
            last_frame: None,
            outcome: None,
            states_seen: 0,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> SessionOutcome {
        let mut pending = VecDeque::from([SessionEvent::Start]);

        loop {
            while let Some(event) = pending.pop_front() {
                let effects = self.machine.handle(event);
                for effect in effects {
                    if let Some(follow_up) = self.execute(effect).await {
                        pending.push_back(follow_up);
                    }
                }
                self.report_states();
            }

            if let Some(outcome) = self.outcome.take() {
                return outcome;
            }

            let take_frame =
                self.machine.is_scanning() && self.frames_open && self.decode_task.is_none();
            let event = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.translate(command),
                    None => {
                        tracing::info!("all session controls dropped");
                        SessionEvent::Cancel
                    }
                },
                acquired = await_slot(&mut self.acquiring) => {
                    self.acquiring = None;
                    self.on_acquired(acquired)
                },
                frame = self.frames.recv(), if take_frame => match frame {
                    Some(frame) => {
                        self.on_frame(frame);
                        continue;
                    }
                    None => {
                        tracing::warn!("frame stream ended while scanning");
                        self.frames_open = false;
                        SessionEvent::Attempted {
                            source: ReadSource::Barcode,
                            attempt: Attempt::Failed(ErrorKind::DecoderFailure),
                        }
                    }
                },
                attempt = await_slot(&mut self.decode_task) => {
                    self.decode_task = None;
                    let attempt = attempt.unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "decode task failed");
                        Attempt::Failed(ErrorKind::DecoderFailure)
                    });
                    SessionEvent::Attempted { source: ReadSource::Barcode, attempt }
                },
                attempt = await_slot(&mut self.ocr_task) => {
                    self.ocr_task = None;
                    let attempt = attempt.unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "OCR task failed");
                        Attempt::Failed(ErrorKind::OcrFailure)
                    });
                    SessionEvent::Attempted { source: ReadSource::Ocr, attempt }
                },
                generation = sleep_until_deadline(self.deadline) => {
                    self.deadline = None;
                    SessionEvent::BudgetExpired { generation }
                },
            };
            pending.push_back(event);
        }
    }

    fn translate(&self, command: SessionCommand) -> SessionEvent {
        match command {
            SessionCommand::SubmitImage(bytes) => SessionEvent::ImageSubmitted(bytes),
            SessionCommand::SubmitManualEntry(text) => SessionEvent::Attempted {
                source: ReadSource::Manual,
                attempt: self.manual.attempt(&Signal::Typed(text)),
            },
            SessionCommand::RequestManualEntry => SessionEvent::ManualRequested,
            SessionCommand::DeclineManualEntry => SessionEvent::ManualDeclined,
            SessionCommand::Cancel => SessionEvent::Cancel,
        }
    }

    fn on_acquired(
        &mut self,
        acquired: Result<Result<DeviceHandle, DeviceError>, tokio::task::JoinError>,
    ) -> SessionEvent {
        let handle = match acquired {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return SessionEvent::DeviceFailed(e.to_string()),
            Err(e) => return SessionEvent::DeviceFailed(format!("acquisition task failed: {e}")),
        };

        self.lease.attach(handle);
        tracing::info!(handle = handle.id(), "capture device acquired");

        let Some(sender) = self.frame_sender.take() else {
            return SessionEvent::DeviceFailed("frame stream already subscribed".to_string());
        };
        if let Err(e) = self.collaborators.device.subscribe_frames(&handle, sender) {
            return SessionEvent::DeviceFailed(e.to_string());
        }
        if self.options.torch {
            self.lease.torch(true);
        }
        SessionEvent::DeviceReady
    }

    fn on_frame(&mut self, frame: Frame) {
        if self.options.snapshot_ocr {
            self.last_frame = Some(frame.clone());
        }
        let barcode = self.barcode.clone();
        self.decode_task = Some(tokio::task::spawn_blocking(move || {
            barcode.attempt(&Signal::Frame(frame))
        }));
    }

    fn discard_decode(&mut self) {
        if self.decode_task.take().is_some() {
            tracing::debug!("in-flight decode result will be discarded");
        }
    }

    async fn execute(&mut self, effect: Effect) -> Option<SessionEvent> {
        match effect {
            Effect::AcquireDevice => {
                let device = Arc::clone(&self.collaborators.device);
                self.acquiring = Some(tokio::task::spawn_blocking(move || device.acquire()));
            }
            Effect::StartDecoder(phase) => {
                let config = match phase {
                    ScanPhase::Primary => self.options.primary_decoder.clone(),
                    ScanPhase::Secondary => self
                        .options
                        .secondary_decoder
                        .clone()
                        .unwrap_or_else(|| self.options.primary_decoder.clone()),
                };
                tracing::debug!(?phase, symbologies = ?config.symbologies, "decoder started");
                // a result decoded under the previous configuration is stale
                self.discard_decode();
                self.barcode.reconfigure(config);
            }
            Effect::StopDecoder => {
                self.discard_decode();
                self.barcode.reset();
                tracing::debug!("decoder stopped");
            }
            Effect::ArmBudget { generation } => {
                self.deadline = Some((Instant::now() + self.options.budget(), generation));
            }
            Effect::DisarmBudget => self.deadline = None,
            Effect::ReleaseDevice => self.release_device().await,
            Effect::RunOcr(bytes) => self.spawn_ocr(Signal::Image(bytes)),
            Effect::OcrSnapshot => match self.last_frame.take() {
                Some(frame) => {
                    tracing::info!(sequence = frame.sequence(), "running OCR on last frame");
                    self.spawn_ocr(Signal::Image(frame.shared_data()));
                }
                None => {
                    return Some(SessionEvent::Attempted {
                        source: ReadSource::Ocr,
                        attempt: Attempt::NoReadYet,
                    });
                }
            },
            Effect::AbortOcr => {
                if self.ocr_task.take().is_some() {
                    tracing::debug!("pending OCR result will be discarded");
                }
            }
            Effect::Notice(message) => self.listener.on_notice(&message),
            Effect::Deliver(outcome) => {
                match &outcome {
                    SessionOutcome::Success(line) => self.listener.on_result(line),
                    SessionOutcome::Failed(kind) => self.listener.on_error(*kind),
                    SessionOutcome::Cancelled => self.listener.on_cancelled(),
                }
                self.outcome = Some(outcome);
            }
        }
        None
    }

    async fn release_device(&mut self) {
        // acquisition still in flight: wait for it so a late handle is not leaked
        if let Some(task) = self.acquiring.take() {
            match task.await {
                Ok(Ok(handle)) => self.lease.attach(handle),
                Ok(Err(e)) => tracing::debug!(error = %e, "acquisition failed before release"),
                Err(e) => tracing::warn!(error = %e, "acquisition task failed before release"),
            }
        }
        self.lease.release();
    }

    fn spawn_ocr(&mut self, signal: Signal) {
        let ocr = Arc::clone(&self.ocr);
        self.ocr_task = Some(tokio::task::spawn_blocking(move || ocr.attempt(&signal)));
    }

    fn report_states(&mut self) {
        let history = self.machine.history();
        for state in &history[self.states_seen..] {
            self.listener.on_state(*state);
        }
        self.states_seen = history.len();
    }
}

//! Acquisition state machine
//!
//! The synchronous core of a session. It is fed [`SessionEvent`]s and answers
//! with [`Effect`]s that the async driver executes in order. All decisions
//! about strategy switching, consensus and device release are made here, so
//! the whole lifecycle can be exercised without a runtime.

use linha_core::{
    ConsensusBuffer, ConsensusVerdict, DigitLine, ErrorKind, RawCandidate, ReadSource, extract,
};
use std::fmt;
use std::sync::Arc;

use crate::application::dto::SessionOptions;
use crate::domain::entities::SessionOutcome;
use crate::domain::services::{Attempt, RawRead};

/// Which barcode decoder configuration is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionState {
    Idle,
    RequestingDevice,
    BarcodeScanning(ScanPhase),
    OcrFallback,
    ManualFallback,
    Success,
    Finalizing,
    Closed,
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionState::Idle => write!(f, "idle"),
            AcquisitionState::RequestingDevice => write!(f, "requesting-device"),
            AcquisitionState::BarcodeScanning(ScanPhase::Primary) => write!(f, "barcode-primary"),
            AcquisitionState::BarcodeScanning(ScanPhase::Secondary) => {
                write!(f, "barcode-secondary")
            }
            AcquisitionState::OcrFallback => write!(f, "ocr-fallback"),
            AcquisitionState::ManualFallback => write!(f, "manual-fallback"),
            AcquisitionState::Success => write!(f, "success"),
            AcquisitionState::Finalizing => write!(f, "finalizing"),
            AcquisitionState::Closed => write!(f, "closed"),
        }
    }
}

/// Inputs to the machine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Start,
    /// The device was acquired and its frame stream is live
    DeviceReady,
    DeviceFailed(String),
    Attempted {
        source: ReadSource,
        attempt: Attempt,
    },
    /// A budget timer fired; stale generations are ignored
    BudgetExpired {
        generation: u64,
    },
    ImageSubmitted(Arc<[u8]>),
    ManualRequested,
    ManualDeclined,
    Cancel,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Start => "start",
            SessionEvent::DeviceReady => "device-ready",
            SessionEvent::DeviceFailed(_) => "device-failed",
            SessionEvent::Attempted { .. } => "attempted",
            SessionEvent::BudgetExpired { .. } => "budget-expired",
            SessionEvent::ImageSubmitted(_) => "image-submitted",
            SessionEvent::ManualRequested => "manual-requested",
            SessionEvent::ManualDeclined => "manual-declined",
            SessionEvent::Cancel => "cancel",
        }
    }
}

/// Work the driver must carry out, in the order returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AcquireDevice,
    /// Configure the decoder for a phase and start feeding it frames
    StartDecoder(ScanPhase),
    StopDecoder,
    ArmBudget {
        generation: u64,
    },
    DisarmBudget,
    /// Switch the torch off and release the device. Emitted at most once.
    ReleaseDevice,
    RunOcr(Arc<[u8]>),
    /// Run OCR on the last frame seen, if any
    OcrSnapshot,
    /// Discard the pending OCR result
    AbortOcr,
    /// Actionable message for the operator
    Notice(String),
    Deliver(SessionOutcome),
}

/// Runs extraction and validation over a one-shot read (OCR or typed).
///
/// Returns the first candidate that validates, otherwise the error of the
/// first candidate tried.
pub fn evaluate_read(raw: &RawRead) -> Result<DigitLine, ErrorKind> {
    let candidates = extract(&raw.text, raw.source, raw.captured_at);
    let mut first_error = None;
    for candidate in &candidates {
        match DigitLine::from_candidate(candidate) {
            Ok(line) => return Ok(line),
            Err(e) => {
                first_error.get_or_insert(ErrorKind::from(e));
            }
        }
    }
    Err(first_error.unwrap_or(ErrorKind::InvalidLength))
}

/// Picks the candidate a streaming read feeds to consensus: a valid line,
/// else a partial payload, else the first one.
fn preferred(candidates: Vec<RawCandidate>) -> Option<RawCandidate> {
    let index = candidates
        .iter()
        .position(|c| linha_core::validate(c.digits()))
        .or_else(|| candidates.iter().position(RawCandidate::is_partial))
        .unwrap_or(0);
    candidates.into_iter().nth(index)
}

fn manual_rejection(kind: ErrorKind, digits: usize) -> String {
    match kind {
        ErrorKind::InvalidLength => format!(
            "Entry has {digits} digits. Type all 47 digits of the line (a 48th is accepted)."
        ),
        ErrorKind::ChecksumMismatch => {
            "Check digits do not match. Compare the typed line with the slip and correct it."
                .to_string()
        }
        other => format!("Entry rejected ({other}). Type the line again."),
    }
}

pub struct AcquisitionMachine {
    state: AcquisitionState,
    history: Vec<AcquisitionState>,
    consensus: ConsensusBuffer,
    has_secondary: bool,
    secondary_tried: bool,
    snapshot_ocr: bool,
    decoder_active: bool,
    budget_armed: bool,
    device_released: bool,
    ocr_pending: bool,
    generation: u64,
    manual_rejections: u32,
}

impl AcquisitionMachine {
    pub fn new(options: &SessionOptions) -> Self {
        Self {
            state: AcquisitionState::Idle,
            history: vec![AcquisitionState::Idle],
            consensus: ConsensusBuffer::new(options.consensus_depth),
            has_secondary: options.secondary_decoder.is_some(),
            secondary_tried: false,
            snapshot_ocr: options.snapshot_ocr,
            decoder_active: false,
            budget_armed: false,
            device_released: false,
            ocr_pending: false,
            generation: 0,
            manual_rejections: 0,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Every state entered so far, starting with `Idle`
    pub fn history(&self) -> &[AcquisitionState] {
        &self.history
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, AcquisitionState::BarcodeScanning(_))
    }

    pub fn is_closed(&self) -> bool {
        self.state == AcquisitionState::Closed
    }

    pub fn consensus(&self) -> &ConsensusBuffer {
        &self.consensus
    }

    pub fn manual_rejections(&self) -> u32 {
        self.manual_rejections
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.is_closed() {
            tracing::debug!(event = event.name(), "event after close ignored");
            return fx;
        }

        match event {
            SessionEvent::Start => {
                if self.state == AcquisitionState::Idle {
                    self.transition(AcquisitionState::RequestingDevice);
                    fx.push(Effect::AcquireDevice);
                }
            }
            SessionEvent::DeviceReady => {
                if self.state == AcquisitionState::RequestingDevice {
                    self.transition(AcquisitionState::BarcodeScanning(ScanPhase::Primary));
                    self.decoder_active = true;
                    fx.push(Effect::StartDecoder(ScanPhase::Primary));
                    self.arm_budget(&mut fx);
                } else {
                    tracing::debug!(state = %self.state, "device became ready after leaving the camera phase");
                    self.release_device(&mut fx);
                }
            }
            SessionEvent::DeviceFailed(reason) => {
                if self.state == AcquisitionState::RequestingDevice {
                    tracing::warn!(%reason, "capture device unavailable");
                    self.finish(SessionOutcome::Failed(ErrorKind::DeviceUnavailable), &mut fx);
                } else {
                    tracing::debug!(%reason, state = %self.state, "late device failure ignored");
                }
            }
            SessionEvent::Attempted { source, attempt } => self.on_attempt(source, attempt, &mut fx),
            SessionEvent::BudgetExpired { generation } => {
                if self.is_scanning() && self.budget_armed && generation == self.generation {
                    tracing::info!(state = %self.state, "barcode budget expired");
                    self.budget_armed = false;
                    self.advance_from_barcode(&mut fx);
                } else {
                    tracing::debug!(generation, current = self.generation, "stale budget expiry");
                }
            }
            SessionEvent::ImageSubmitted(bytes) => match self.state {
                AcquisitionState::BarcodeScanning(_) => {
                    self.leave_barcode(&mut fx);
                    self.transition(AcquisitionState::OcrFallback);
                    self.run_ocr(bytes, &mut fx);
                }
                AcquisitionState::OcrFallback => self.run_ocr(bytes, &mut fx),
                _ => fx.push(Effect::Notice(format!(
                    "Image ignored while {}; wait for the camera or type the line.",
                    self.state
                ))),
            },
            SessionEvent::ManualRequested => {
                if self.state != AcquisitionState::ManualFallback {
                    self.enter_manual(&mut fx);
                }
            }
            SessionEvent::ManualDeclined => match self.state {
                AcquisitionState::OcrFallback | AcquisitionState::ManualFallback => {
                    tracing::info!(
                        rejections = self.manual_rejections,
                        "operator declined manual entry"
                    );
                    self.finish(
                        SessionOutcome::Failed(ErrorKind::AllStrategiesExhausted),
                        &mut fx,
                    );
                }
                _ => fx.push(Effect::Notice(
                    "Barcode scanning is still running; cancel to stop the session.".to_string(),
                )),
            },
            SessionEvent::Cancel => {
                tracing::info!(state = %self.state, "session cancelled");
                self.finish(SessionOutcome::Cancelled, &mut fx);
            }
        }

        fx
    }

    fn on_attempt(&mut self, source: ReadSource, attempt: Attempt, fx: &mut Vec<Effect>) {
        if source == ReadSource::Ocr {
            self.ocr_pending = false;
        }

        match (self.state, source) {
            (AcquisitionState::BarcodeScanning(_), ReadSource::Barcode) => {
                self.on_barcode(attempt, fx)
            }
            (AcquisitionState::OcrFallback, ReadSource::Ocr) => self.on_ocr(attempt, fx),
            (_, ReadSource::Manual) => {
                if self.state != AcquisitionState::ManualFallback {
                    self.enter_manual(fx);
                }
                self.on_manual(attempt, fx);
            }
            (state, source) => {
                tracing::debug!(%state, %source, "attempt from inactive strategy ignored");
            }
        }
    }

    fn on_barcode(&mut self, attempt: Attempt, fx: &mut Vec<Effect>) {
        match attempt {
            Attempt::Read(raw) => {
                let candidates = extract(&raw.text, raw.source, raw.captured_at);
                let Some(candidate) = preferred(candidates) else {
                    tracing::debug!(text = %raw.text, "decoded text has no plausible digit run");
                    return;
                };
                match self.consensus.observe(candidate) {
                    ConsensusVerdict::Confirmed(line) => {
                        self.finish(SessionOutcome::Success(line), fx)
                    }
                    ConsensusVerdict::Ambiguous => {
                        tracing::debug!("consecutive barcode reads disagree");
                    }
                    ConsensusVerdict::Pending => {}
                }
            }
            Attempt::NoReadYet => {}
            Attempt::Failed(kind) => {
                tracing::warn!(%kind, state = %self.state, "barcode phase failed");
                self.advance_from_barcode(fx);
            }
        }
    }

    fn on_ocr(&mut self, attempt: Attempt, fx: &mut Vec<Effect>) {
        match attempt {
            Attempt::Read(raw) => match evaluate_read(&raw) {
                Ok(line) => self.finish(SessionOutcome::Success(line), fx),
                Err(kind) => {
                    tracing::info!(%kind, "OCR text did not yield a valid line");
                    fx.push(Effect::Notice(
                        "No valid digit line found in the image. Submit a sharper photo or type the line."
                            .to_string(),
                    ));
                }
            },
            Attempt::NoReadYet => fx.push(Effect::Notice(
                "No text recognized. Submit a photo of the digit line or type it.".to_string(),
            )),
            Attempt::Failed(_) => fx.push(Effect::Notice(
                "Text recognition failed. Submit another photo or type the line.".to_string(),
            )),
        }
    }

    fn on_manual(&mut self, attempt: Attempt, fx: &mut Vec<Effect>) {
        let Attempt::Read(raw) = attempt else {
            fx.push(Effect::Notice("Type the digit line to continue.".to_string()));
            return;
        };

        match evaluate_read(&raw) {
            Ok(line) => self.finish(SessionOutcome::Success(line), fx),
            Err(kind) => {
                self.manual_rejections += 1;
                let digits = raw.text.chars().filter(char::is_ascii_digit).count();
                tracing::info!(%kind, digits, rejections = self.manual_rejections, "manual entry rejected");
                fx.push(Effect::Notice(manual_rejection(kind, digits)));
            }
        }
    }

    fn advance_from_barcode(&mut self, fx: &mut Vec<Effect>) {
        let can_retry = self.state == AcquisitionState::BarcodeScanning(ScanPhase::Primary)
            && self.has_secondary
            && !self.secondary_tried;

        if can_retry {
            self.secondary_tried = true;
            self.consensus.reset();
            self.transition(AcquisitionState::BarcodeScanning(ScanPhase::Secondary));
            fx.push(Effect::StartDecoder(ScanPhase::Secondary));
            self.arm_budget(fx);
            return;
        }

        self.leave_barcode(fx);
        self.transition(AcquisitionState::OcrFallback);
        fx.push(Effect::Notice(
            "Barcode not confirmed. Submit a photo of the digit line or type it.".to_string(),
        ));
        if self.snapshot_ocr {
            self.ocr_pending = true;
            fx.push(Effect::OcrSnapshot);
        }
    }

    fn enter_manual(&mut self, fx: &mut Vec<Effect>) {
        if self.is_scanning() {
            self.leave_barcode(fx);
        } else {
            self.release_device(fx);
        }
        self.abort_ocr(fx);
        self.transition(AcquisitionState::ManualFallback);
        fx.push(Effect::Notice(
            "Type the 47 digits of the line as printed on the slip.".to_string(),
        ));
    }

    fn run_ocr(&mut self, bytes: Arc<[u8]>, fx: &mut Vec<Effect>) {
        if self.ocr_pending {
            fx.push(Effect::Notice(
                "Still reading the previous image; try again when it finishes.".to_string(),
            ));
            return;
        }
        self.ocr_pending = true;
        fx.push(Effect::RunOcr(bytes));
    }

    fn leave_barcode(&mut self, fx: &mut Vec<Effect>) {
        self.consensus.reset();
        self.disarm_budget(fx);
        if self.decoder_active {
            self.decoder_active = false;
            fx.push(Effect::StopDecoder);
        }
        self.release_device(fx);
    }

    fn finish(&mut self, outcome: SessionOutcome, fx: &mut Vec<Effect>) {
        if let SessionOutcome::Failed(kind) = &outcome {
            debug_assert!(kind.is_terminal(), "{kind:?} cannot end a session");
        }
        if outcome.is_success() {
            self.transition(AcquisitionState::Success);
            self.transition(AcquisitionState::Finalizing);
        }
        self.leave_barcode(fx);
        self.abort_ocr(fx);
        fx.push(Effect::Deliver(outcome));
        self.transition(AcquisitionState::Closed);
    }

    fn arm_budget(&mut self, fx: &mut Vec<Effect>) {
        self.generation += 1;
        self.budget_armed = true;
        fx.push(Effect::ArmBudget {
            generation: self.generation,
        });
    }

    fn disarm_budget(&mut self, fx: &mut Vec<Effect>) {
        if self.budget_armed {
            self.budget_armed = false;
            fx.push(Effect::DisarmBudget);
        }
    }

    fn abort_ocr(&mut self, fx: &mut Vec<Effect>) {
        if self.ocr_pending {
            self.ocr_pending = false;
            fx.push(Effect::AbortOcr);
        }
    }

    fn release_device(&mut self, fx: &mut Vec<Effect>) {
        if !self.device_released {
            self.device_released = true;
            fx.push(Effect::ReleaseDevice);
        }
    }

    fn transition(&mut self, next: AcquisitionState) {
        tracing::info!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.history.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn typed(text: &str) -> RawRead {
        RawRead::new(text, ReadSource::Manual, Instant::now())
    }

    #[test]
    fn test_evaluate_empty_is_invalid_length() {
        assert_eq!(evaluate_read(&typed("")), Err(ErrorKind::InvalidLength));
    }

    #[test]
    fn test_evaluate_bad_check_digits() {
        assert_eq!(
            evaluate_read(&typed(&"1".repeat(47))),
            Err(ErrorKind::ChecksumMismatch)
        );
    }

    #[test]
    fn test_preferred_takes_partial_over_noise() {
        let now = Instant::now();
        let candidates = vec![
            RawCandidate::new("1".repeat(47), ReadSource::Barcode, now),
            RawCandidate::new("2".repeat(44), ReadSource::Barcode, now),
        ];
        let picked = preferred(candidates).unwrap();
        assert!(picked.is_partial());
        assert!(preferred(Vec::new()).is_none());
    }

    #[test]
    fn test_start_requests_device() {
        let mut machine = AcquisitionMachine::new(&SessionOptions::default());
        assert_eq!(machine.handle(SessionEvent::Start), vec![Effect::AcquireDevice]);
        assert_eq!(machine.state(), AcquisitionState::RequestingDevice);
        // a second start is a no-op
        assert!(machine.handle(SessionEvent::Start).is_empty());
    }
}

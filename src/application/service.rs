//! Acquisition service
//!
//! Entry point for consumers: holds the collaborators and options, and starts
//! one session task per scan.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::dto::SessionOptions;
use crate::application::session::{
    Collaborators, SessionControl, SessionDriver, SessionHandle, SessionListener,
};
use crate::domain::repositories::{BarcodeDecoder, CaptureDevice, ImagePreprocessor, OcrEngine};

/// Starts acquisition sessions
///
/// # Example
///
/// ```ignore
/// let service = AcquisitionService::new(device, decoder, preprocessor, ocr, options)?;
/// let session = service.start_session(PrintingListener);
/// let outcome = session.join().await;
/// ```
pub struct AcquisitionService {
    collaborators: Collaborators,
    options: SessionOptions,
}

impl AcquisitionService {
    /// Creates a service after validating `options`
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        decoder: Arc<dyn BarcodeDecoder>,
        preprocessor: Arc<dyn ImagePreprocessor>,
        ocr_engine: Arc<dyn OcrEngine>,
        options: SessionOptions,
    ) -> Result<Self> {
        options.validate().context("invalid session options")?;
        Ok(Self {
            collaborators: Collaborators {
                device,
                decoder,
                preprocessor,
                ocr_engine,
            },
            options,
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Spawns a session on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn start_session<L: SessionListener>(&self, listener: L) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let driver = SessionDriver::new(self.collaborators.clone(), self.options.clone(), listener);

        tracing::info!(
            budget_ms = self.options.attempt_budget_ms,
            secondary = self.options.secondary_decoder.is_some(),
            "starting acquisition session"
        );
        let task = tokio::spawn(driver.run(commands_rx));
        SessionHandle::new(SessionControl::new(commands_tx), task)
    }
}

//! Console session listener

use linha_core::{DigitLine, ErrorKind};
use tokio::sync::mpsc;

use crate::application::{AcquisitionState, SessionListener};

/// What the listener forwards to the CLI loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    State(AcquisitionState),
    Notice(String),
}

/// Prints operator messages to stderr and forwards session progress
pub struct ConsoleListener {
    events: mpsc::UnboundedSender<ConsoleEvent>,
}

impl ConsoleListener {
    pub fn new(events: mpsc::UnboundedSender<ConsoleEvent>) -> Self {
        Self { events }
    }

    fn forward(&self, event: ConsoleEvent) {
        // the CLI loop may already be gone after the outcome
        let _ = self.events.send(event);
    }
}

impl SessionListener for ConsoleListener {
    fn on_result(&self, line: &DigitLine) {
        tracing::debug!(%line, "session confirmed a line");
    }

    fn on_error(&self, kind: ErrorKind) {
        eprintln!("[!] {kind}");
    }

    fn on_cancelled(&self) {
        eprintln!("[!] session cancelled");
    }

    fn on_notice(&self, message: &str) {
        eprintln!("[>] {message}");
        self.forward(ConsoleEvent::Notice(message.to_string()));
    }

    fn on_state(&self, state: AcquisitionState) {
        tracing::debug!(%state, "session state");
        self.forward(ConsoleEvent::State(state));
    }
}

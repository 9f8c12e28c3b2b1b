//! Application layer
//!
//! The acquisition state machine, the async session driver that executes it,
//! and the service consumers start sessions from.

pub mod dto;
pub mod orchestrator;
mod service;
mod session;

pub use orchestrator::{
    AcquisitionMachine, AcquisitionState, Effect, ScanPhase, SessionEvent, evaluate_read,
};
pub use service::AcquisitionService;
pub use session::{Collaborators, SessionClosed, SessionControl, SessionHandle, SessionListener};

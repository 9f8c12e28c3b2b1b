//! Linha - boleto digit line acquisition
//!
//! Reads the 47-digit line of a Brazilian bank slip from a camera, a photo or
//! typed input, and only ever hands out lines whose check digits match.
//!
//! The pure rules (checksums, candidate extraction, read consensus) live in
//! `linha_core` and are re-exported here. This crate adds the acquisition
//! session: collaborator ports, recognition strategies, the state machine and
//! its async driver, concrete adapters and the CLI.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use application::dto::SessionOptions;
pub use application::{AcquisitionService, SessionHandle, SessionListener};
pub use domain::entities::{Frame, SessionOutcome};
pub use linha_core::{DigitLine, ErrorKind, LineForm, RawCandidate, ReadSource, extract, validate};

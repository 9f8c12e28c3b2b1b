//! Domain entities
//!
//! Core objects that flow through an acquisition session.

mod frame;
mod outcome;

pub use frame::Frame;
pub use outcome::SessionOutcome;

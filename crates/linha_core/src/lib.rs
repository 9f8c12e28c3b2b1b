pub mod checksum;
pub mod consensus;
mod error;
pub mod extraction;
mod types;

pub use checksum::{ChecksumError, check, validate, validate_symbol};
pub use consensus::{ConsensusBuffer, ConsensusVerdict};
pub use error::ErrorKind;
pub use extraction::extract;
pub use types::{DigitLine, LineForm, RawCandidate, ReadSource};

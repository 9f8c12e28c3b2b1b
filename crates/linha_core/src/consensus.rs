//! Read confirmation for streaming recognition.
//!
//! A camera delivers many reads per second and no single frame is
//! authoritative. A read that passes the printed-line validator on its own is
//! final. Anything weaker needs two consecutive identical reads, and partial
//! barcode payloads additionally need their concatenation to validate.

use std::collections::VecDeque;

use crate::checksum::{PRINTED_LEN, PRINTED_LEN_EXTENDED};
use crate::types::{DigitLine, RawCandidate};

pub const DEFAULT_DEPTH: usize = 3;
pub const MIN_DEPTH: usize = 2;

/// Partial segments are concatenated up to this many digits.
pub const CONCAT_TARGET_LEN: usize = PRINTED_LEN_EXTENDED;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusVerdict {
    Confirmed(DigitLine),
    /// Not enough evidence yet.
    Pending,
    /// The read disagreed with the previous one; the streak was reset.
    Ambiguous,
}

#[derive(Debug)]
pub struct ConsensusBuffer {
    depth: usize,
    recent: VecDeque<RawCandidate>,
    concatenation: String,
    streak: usize,
}

impl Default for ConsensusBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl ConsensusBuffer {
    /// `depth` is clamped to 2..=3 retained reads.
    pub fn new(depth: usize) -> Self {
        let depth = depth.clamp(MIN_DEPTH, DEFAULT_DEPTH);
        Self {
            depth,
            recent: VecDeque::with_capacity(depth),
            concatenation: String::with_capacity(CONCAT_TARGET_LEN),
            streak: 0,
        }
    }

    pub fn observe(&mut self, candidate: RawCandidate) -> ConsensusVerdict {
        if let Ok(line) = DigitLine::from_candidate(&candidate) {
            self.remember(candidate);
            return ConsensusVerdict::Confirmed(line);
        }

        let had_previous = !self.recent.is_empty();
        let matches_previous = self
            .recent
            .back()
            .is_some_and(|prev| prev.digits() == candidate.digits());

        if !candidate.is_partial() {
            // full-length read with a bad check digit: an outlier
            self.streak = 0;
            self.concatenation.clear();
            self.remember(candidate);
            return if had_previous {
                ConsensusVerdict::Ambiguous
            } else {
                ConsensusVerdict::Pending
            };
        }

        if matches_previous {
            self.streak += 1;
        } else {
            self.streak = 0;
            self.concatenation.clear();
        }

        self.append(candidate.digits());
        let latest = candidate.digits().to_string();
        self.remember(candidate);

        if self.streak >= 1 && self.concatenation.len() >= PRINTED_LEN {
            if let Ok(line) = DigitLine::parse(&self.concatenation) {
                return ConsensusVerdict::Confirmed(line);
            }
            if self.concatenation.len() >= CONCAT_TARGET_LEN {
                self.concatenation = latest;
            }
        }

        if matches_previous || !had_previous {
            ConsensusVerdict::Pending
        } else {
            ConsensusVerdict::Ambiguous
        }
    }

    /// Drops every retained read. Called on strategy switch.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.concatenation.clear();
        self.streak = 0;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn streak(&self) -> usize {
        self.streak
    }

    pub fn recent(&self) -> impl Iterator<Item = &RawCandidate> {
        self.recent.iter()
    }

    pub fn concatenation(&self) -> &str {
        &self.concatenation
    }

    fn append(&mut self, digits: &str) {
        let room = CONCAT_TARGET_LEN.saturating_sub(self.concatenation.len());
        let take = room.min(digits.len());
        self.concatenation.push_str(&digits[..take]);
    }

    fn remember(&mut self, candidate: RawCandidate) {
        if self.recent.len() == self.depth {
            self.recent.pop_front();
        }
        self.recent.push_back(candidate);
    }
}

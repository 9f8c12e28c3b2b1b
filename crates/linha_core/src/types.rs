use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::checksum::{
    self, ChecksumError, PRINTED_LEN, PRINTED_LEN_EXTENDED, SYMBOL_LEN,
};

/// Recognition source that produced a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadSource {
    Barcode,
    Ocr,
    Manual,
}

impl fmt::Display for ReadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadSource::Barcode => write!(f, "barcode"),
            ReadSource::Ocr => write!(f, "ocr"),
            ReadSource::Manual => write!(f, "manual"),
        }
    }
}

/// Digit-only string pulled out of a single recognition attempt.
///
/// Carries no guarantee beyond "only ASCII digits".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    digits: String,
    source: ReadSource,
    captured_at: Instant,
}

impl RawCandidate {
    pub fn new(digits: String, source: ReadSource, captured_at: Instant) -> Self {
        debug_assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        Self {
            digits,
            source,
            captured_at,
        }
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// A bare barcode payload: too short to carry the block check digits.
    pub fn is_partial(&self) -> bool {
        self.digits.len() == SYMBOL_LEN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineForm {
    /// 47 digits, or 48 with a trailing unchecked digit.
    Printed,
    /// 44-digit barcode payload.
    Symbol,
}

/// A validated boleto digit line.
///
/// Can only be built through a validator, so holding one is proof that the
/// check digits matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigitLine {
    digits: String,
    form: LineForm,
}

impl DigitLine {
    /// Validates a printed line (47 or 48 digits, no separators).
    pub fn parse(digits: &str) -> Result<Self, ChecksumError> {
        checksum::check(digits)?;
        Ok(Self {
            digits: digits.to_string(),
            form: LineForm::Printed,
        })
    }

    /// Validates a 44-digit barcode payload.
    pub fn from_symbol(digits: &str) -> Result<Self, ChecksumError> {
        checksum::check_symbol(digits)?;
        Ok(Self {
            digits: digits.to_string(),
            form: LineForm::Symbol,
        })
    }

    pub fn from_candidate(candidate: &RawCandidate) -> Result<Self, ChecksumError> {
        Self::parse(candidate.digits())
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn form(&self) -> LineForm {
        self.form
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Groups a printed line the way it appears on the slip.
    ///
    /// `AAAAA.AAAAA BBBBB.BBBBBB CCCCC.CCCCCC D EEEEEEEEEEEEEE`, with the
    /// tolerated 48th digit appended as its own group.
    pub fn formatted(&self) -> String {
        if self.form == LineForm::Symbol {
            return self.digits.clone();
        }

        let d = &self.digits;
        let mut out = format!(
            "{}.{} {}.{} {}.{} {} {}",
            &d[0..5],
            &d[5..10],
            &d[10..15],
            &d[15..21],
            &d[21..26],
            &d[26..32],
            &d[32..33],
            &d[33..PRINTED_LEN],
        );
        if d.len() == PRINTED_LEN_EXTENDED {
            out.push(' ');
            out.push_str(&d[PRINTED_LEN..]);
        }
        out
    }
}

impl fmt::Display for DigitLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

impl AsRef<str> for DigitLine {
    fn as_ref(&self) -> &str {
        &self.digits
    }
}

impl FromStr for DigitLine {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == SYMBOL_LEN {
            Self::from_symbol(s)
        } else {
            Self::parse(s)
        }
    }
}

impl Serialize for DigitLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.digits)
    }
}

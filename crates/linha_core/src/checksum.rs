//! Check-digit arithmetic for boleto digit lines.
//!
//! The printed line carries three modulo-10 block check digits and one
//! modulo-11 overall check digit. The layout and weights below are the ones
//! the settlement tooling has always accepted and must not drift.

use thiserror::Error;

pub const SYMBOL_LEN: usize = 44;
pub const PRINTED_LEN: usize = 47;
pub const PRINTED_LEN_EXTENDED: usize = 48;

/// `(first digit, check digit index)` of each modulo-10 block.
const BLOCKS: [(usize, usize); 3] = [(0, 9), (10, 20), (21, 31)];

const OVERALL_CHECK_INDEX: usize = 32;
const OVERALL_HEAD: std::ops::Range<usize> = 0..4;
const OVERALL_TAIL: std::ops::Range<usize> = 32..PRINTED_LEN;

const SYMBOL_CHECK_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChecksumError {
    #[error("unexpected digit count: {0}")]
    InvalidLength(usize),

    #[error("non-digit character at position {0}")]
    NonDigit(usize),

    #[error("block {block} check digit mismatch: expected {expected}, found {found}")]
    BlockMismatch { block: usize, expected: u8, found: u8 },

    #[error("overall check digit mismatch: expected {expected}, found {found}")]
    OverallMismatch { expected: u8, found: u8 },
}

/// Modulo-10 check digit of `digits`.
///
/// Weights alternate 2, 1, 2, ... starting from the rightmost digit; products
/// above 9 are reduced by 9.
pub fn modulo10(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let factor = if i % 2 == 0 { 2 } else { 1 };
            let product = u32::from(d) * factor;
            if product > 9 { product - 9 } else { product }
        })
        .sum();

    ((10 - sum % 10) % 10) as u8
}

/// Modulo-11 check digit of `digits`.
///
/// Weights run 2..=9 from the rightmost digit and wrap back to 2. Remainders
/// 0, 1 and 10 map to 1.
pub fn modulo11(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| u32::from(d) * (2 + (i as u32 % 8)))
        .sum();

    match sum % 11 {
        0 | 1 | 10 => 1,
        remainder => (11 - remainder) as u8,
    }
}

fn to_digits(candidate: &str) -> Result<Vec<u8>, ChecksumError> {
    candidate
        .bytes()
        .enumerate()
        .map(|(pos, b)| {
            if b.is_ascii_digit() {
                Ok(b - b'0')
            } else {
                Err(ChecksumError::NonDigit(pos))
            }
        })
        .collect()
}

/// Runs every printed-line rule and reports the first one that fails.
///
/// A 48th digit is accepted and never checked.
pub fn check(candidate: &str) -> Result<(), ChecksumError> {
    let len = candidate.len();
    if len != PRINTED_LEN && len != PRINTED_LEN_EXTENDED {
        return Err(ChecksumError::InvalidLength(len));
    }

    let digits = to_digits(candidate)?;

    for (block, &(start, check_index)) in BLOCKS.iter().enumerate() {
        let expected = modulo10(&digits[start..check_index]);
        let found = digits[check_index];
        if expected != found {
            return Err(ChecksumError::BlockMismatch {
                block: block + 1,
                expected,
                found,
            });
        }
    }

    let payload: Vec<u8> = digits[OVERALL_HEAD]
        .iter()
        .chain(&digits[OVERALL_TAIL])
        .copied()
        .collect();
    let expected = modulo11(&payload);
    let found = digits[OVERALL_CHECK_INDEX];
    if expected != found {
        return Err(ChecksumError::OverallMismatch { expected, found });
    }

    Ok(())
}

/// Printed-line validator: 47 or 48 digits with all four check digits correct.
pub fn validate(candidate: &str) -> bool {
    check(candidate).is_ok()
}

/// Checks a 44-digit barcode payload against its overall check digit.
pub fn check_symbol(candidate: &str) -> Result<(), ChecksumError> {
    if candidate.len() != SYMBOL_LEN {
        return Err(ChecksumError::InvalidLength(candidate.len()));
    }

    let digits = to_digits(candidate)?;
    let payload: Vec<u8> = digits[..SYMBOL_CHECK_INDEX]
        .iter()
        .chain(&digits[SYMBOL_CHECK_INDEX + 1..])
        .copied()
        .collect();

    let expected = modulo11(&payload);
    let found = digits[SYMBOL_CHECK_INDEX];
    if expected != found {
        return Err(ChecksumError::OverallMismatch { expected, found });
    }

    Ok(())
}

pub fn validate_symbol(candidate: &str) -> bool {
    check_symbol(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits(s: &str) -> Vec<u8> {
        s.bytes().map(|b| b - b'0').collect()
    }

    #[test]
    fn test_modulo10_known_block() {
        // 0019050095 -> 5 is the usual textbook block
        assert_eq!(modulo10(&digits("001905009")), 5);
    }

    #[test]
    fn test_modulo10_reduces_large_products() {
        // 9 * 2 = 18 -> 9
        assert_eq!(modulo10(&digits("9")), 1);
        assert_eq!(modulo10(&digits("0")), 0);
    }

    #[test]
    fn test_modulo11_wraps_weights() {
        // nine ones: weights 2..9 then 2 again -> 46, 46 % 11 = 2 -> 9
        assert_eq!(modulo11(&digits("111111111")), 9);
    }

    #[test]
    fn test_modulo11_low_remainders_map_to_one() {
        // empty sum -> remainder 0
        assert_eq!(modulo11(&[]), 1);
        // 5 * 2 = 10 -> remainder 10
        assert_eq!(modulo11(&digits("5")), 1);
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        assert_eq!(check(""), Err(ChecksumError::InvalidLength(0)));
        assert_eq!(
            check(&"1".repeat(46)),
            Err(ChecksumError::InvalidLength(46))
        );
        assert_eq!(
            check(&"1".repeat(49)),
            Err(ChecksumError::InvalidLength(49))
        );
    }

    #[test]
    fn test_rejects_non_digits() {
        let mut line = "0".repeat(47);
        line.replace_range(5..6, "x");
        assert_eq!(check(&line), Err(ChecksumError::NonDigit(5)));
    }

    #[test]
    fn test_block_mismatch_reports_block() {
        let line = "0".repeat(9) + "1" + &"0".repeat(37);
        assert_eq!(
            check(&line),
            Err(ChecksumError::BlockMismatch {
                block: 1,
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn test_symbol_check_digit() {
        let mut payload = "0".repeat(SYMBOL_LEN);
        // all zeros -> remainder 0 -> check digit 1
        assert!(!validate_symbol(&payload));
        payload.replace_range(4..5, "1");
        assert!(validate_symbol(&payload));
    }
}

//! Candidate extraction from free recognized text.
//!
//! Recognition engines return text with dots, spaces, dashes and stray
//! characters mixed in. Extraction only turns that text into digit strings of
//! a plausible length; it never decides whether one is correct.

use std::collections::HashSet;
use std::time::Instant;

use crate::checksum::{PRINTED_LEN, PRINTED_LEN_EXTENDED, SYMBOL_LEN};
use crate::types::{RawCandidate, ReadSource};

/// Digit counts a single visual group may have to be kept as-is.
pub const GROUP_LENGTHS: [usize; 3] = [SYMBOL_LEN, PRINTED_LEN, PRINTED_LEN_EXTENDED];

/// Window sizes tried, in order, over the flattened digits.
pub const WINDOW_LENGTHS: [usize; 2] = [PRINTED_LEN, PRINTED_LEN_EXTENDED];

fn digits_of(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Strict pass: each text line is one visual group whose digit runs are
/// joined in order.
pub fn strict_groups(raw_text: &str) -> Vec<String> {
    raw_text
        .lines()
        .map(digits_of)
        .filter(|digits| GROUP_LENGTHS.contains(&digits.len()))
        .collect()
}

/// Fallback pass: every 47-digit window over all digits in the text, then
/// every 48-digit window.
pub fn sliding_windows(raw_text: &str) -> Vec<String> {
    let all = digits_of(raw_text);
    let mut windows = Vec::new();

    for len in WINDOW_LENGTHS {
        if all.len() < len {
            continue;
        }
        for start in 0..=all.len() - len {
            windows.push(all[start..start + len].to_string());
        }
    }

    windows
}

/// Extracts candidate digit strings from `raw_text`.
///
/// The strict pass wins when it finds anything; otherwise the sliding window
/// pass runs. Duplicates are dropped, first occurrence kept.
pub fn extract(raw_text: &str, source: ReadSource, captured_at: Instant) -> Vec<RawCandidate> {
    let mut found = strict_groups(raw_text);
    if found.is_empty() {
        found = sliding_windows(raw_text);
    }

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|digits| seen.insert(digits.clone()))
        .map(|digits| RawCandidate::new(digits, source, captured_at))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<String> {
        extract(text, ReadSource::Ocr, Instant::now())
            .into_iter()
            .map(|c| c.digits().to_string())
            .collect()
    }

    #[test]
    fn test_no_digits_yields_nothing() {
        assert!(run("").is_empty());
        assert!(run("BANCO ITAU S.A. - pagavel em qualquer banco").is_empty());
    }

    #[test]
    fn test_strict_joins_runs_on_a_line() {
        let line = "12345.67890 12345.678901 12345.678901 1 12345678901234";
        let got = run(line);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].len(), 47);
        assert!(got[0].starts_with("1234567890"));
    }

    #[test]
    fn test_strict_keeps_each_plausible_line() {
        let a = "1".repeat(44);
        let b = "2".repeat(47);
        let text = format!("header 123\n{a}\nnoise\n{b}\n");
        assert_eq!(run(&text), vec![a, b]);
    }

    #[test]
    fn test_windows_used_when_strict_fails() {
        // 50 digits split over two lines: no line has a plausible length
        let text = format!("{}\n{}", "1".repeat(25), "0123456789".repeat(2) + "12345");
        let got = run(&text);
        let all: String = text.chars().filter(char::is_ascii_digit).collect();
        assert_eq!(all.len(), 50);
        // 4 windows of 47 and 3 of 48, none repeated
        assert_eq!(got.len(), 7);
        assert_eq!(got[0], all[0..47]);
        assert_eq!(got[4], all[0..48]);
    }

    #[test]
    fn test_duplicate_windows_collapse() {
        let got = run(&"7".repeat(49));
        assert_eq!(got, vec!["7".repeat(47), "7".repeat(48)]);
    }

    #[test]
    fn test_short_text_has_no_windows() {
        assert!(run(&"9".repeat(46)).is_empty());
    }

    #[test]
    fn test_candidates_are_tagged() {
        let now = Instant::now();
        let got = extract(&"3".repeat(47), ReadSource::Manual, now);
        assert_eq!(got[0].source(), ReadSource::Manual);
        assert_eq!(got[0].captured_at(), now);
    }
}

use linha_core::checksum::{self, modulo10, modulo11};
use linha_core::{ChecksumError, DigitLine, ErrorKind, LineForm, ReadSource, extract, validate};
use proptest::prelude::*;
use std::time::Instant;

const VALID_LINE: &str = "34191790010104351004791020150008184410026000000";

/// Fills in the three block check digits, then finds an overall check digit
/// (nudging the last digit when no fixed point exists for the payload).
fn seal(mut d: [u8; 47]) -> [u8; 47] {
    for (start, check) in [(0, 9), (10, 20), (21, 31)] {
        d[check] = modulo10(&d[start..check]);
    }
    for bump in 0..10u8 {
        let mut c = d;
        c[46] = (d[46] + bump) % 10;
        for dv in 0..10u8 {
            c[32] = dv;
            let payload: Vec<u8> = c[0..4].iter().chain(&c[32..47]).copied().collect();
            if modulo11(&payload) == dv {
                return c;
            }
        }
    }
    unreachable!("some nudge of the last digit always admits a check digit")
}

fn render(d: &[u8]) -> String {
    d.iter().map(|x| char::from(b'0' + x)).collect()
}

/// Independent restatement of the overall rule with an explicit weight table.
fn overall_holds(line: &str) -> bool {
    const WEIGHTS: [u32; 19] = [4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let d: Vec<u32> = line.bytes().map(|b| u32::from(b - b'0')).collect();
    let payload: Vec<u32> = d[0..4].iter().chain(&d[32..47]).copied().collect();
    let sum: u32 = payload.iter().zip(WEIGHTS).map(|(x, w)| x * w).sum();
    let expected = match sum % 11 {
        0 | 1 | 10 => 1,
        r => 11 - r,
    };
    expected == d[32]
}

fn digits_strategy() -> impl Strategy<Value = [u8; 47]> {
    prop::array::uniform32(0u8..10).prop_flat_map(|head| {
        prop::array::uniform15(0u8..10).prop_map(move |tail| {
            let mut d = [0u8; 47];
            d[..32].copy_from_slice(&head);
            d[32..].copy_from_slice(&tail);
            d
        })
    })
}

proptest! {
    #[test]
    fn sealed_lines_validate(d in digits_strategy()) {
        let line = render(&seal(d));
        prop_assert!(validate(&line));
    }

    #[test]
    fn forty_eighth_digit_is_ignored(d in digits_strategy(), extra in 0u8..10) {
        let line = render(&seal(d)) + &extra.to_string();
        prop_assert!(validate(&line));
    }

    #[test]
    fn validation_is_idempotent(s in "[0-9]{44,49}") {
        prop_assert_eq!(validate(&s), validate(&s));
    }

    #[test]
    fn block_digit_mutation_is_rejected(d in digits_strategy(), pos in 0usize..32, delta in 1u8..10) {
        let mut sealed = seal(d);
        sealed[pos] = (sealed[pos] + delta) % 10;
        prop_assert!(!validate(&render(&sealed)));
    }

    #[test]
    fn tail_mutation_matches_overall_rule(d in digits_strategy(), pos in 32usize..47, delta in 1u8..10) {
        let mut sealed = seal(d);
        sealed[pos] = (sealed[pos] + delta) % 10;
        let line = render(&sealed);
        prop_assert_eq!(validate(&line), overall_holds(&line));
    }
}

#[test]
fn test_known_line_is_valid() {
    assert!(validate(VALID_LINE));
    let line = DigitLine::parse(VALID_LINE).unwrap();
    assert_eq!(line.form(), LineForm::Printed);
    assert_eq!(
        line.formatted(),
        "34191.79001 01043.510047 91020.150008 1 84410026000000"
    );
}

#[test]
fn test_changed_last_digit_is_rejected() {
    let changed = format!("{}2", &VALID_LINE[..46]);
    assert_eq!(
        checksum::check(&changed).map_err(ErrorKind::from),
        Err(ErrorKind::ChecksumMismatch)
    );
}

#[test]
fn test_printed_groups_extract_to_the_valid_line() {
    let text = "Linha: 34191.79001 01043.510047 91020.150008 1 84410026000000";
    let candidates = extract(text, ReadSource::Ocr, Instant::now());
    assert_eq!(candidates.len(), 1);
    assert!(validate(candidates[0].digits()));
}

#[test]
fn test_short_printed_example_is_structurally_rejected() {
    // only 44 digits once separators are dropped
    let text = "34191.79001 01043.510047 91020.150008 5 84410026000";
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    assert_eq!(digits.len(), 44);
    assert_eq!(
        checksum::check(&digits),
        Err(ChecksumError::InvalidLength(44))
    );
}

#[test]
fn test_from_str_picks_form_by_length() {
    let printed: DigitLine = VALID_LINE.parse().unwrap();
    assert_eq!(printed.form(), LineForm::Printed);

    let mut symbol = "0".repeat(44);
    symbol.replace_range(4..5, "1");
    let parsed: DigitLine = symbol.parse().unwrap();
    assert_eq!(parsed.form(), LineForm::Symbol);
    assert_eq!(parsed.formatted(), symbol);
}

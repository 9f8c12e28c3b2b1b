#![no_main]

use libfuzzer_sys::fuzz_target;
use linha_core::{DigitLine, validate, validate_symbol};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let valid = validate(s);
        let _ = validate_symbol(s);
        // a validated line always parses
        if valid {
            assert!(DigitLine::parse(s).is_ok());
        }
    }
});

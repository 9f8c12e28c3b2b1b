#![no_main]

use libfuzzer_sys::fuzz_target;
use linha_core::{ReadSource, extract};
use std::time::Instant;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for candidate in extract(&text, ReadSource::Ocr, Instant::now()) {
        assert!(candidate.digits().bytes().all(|b| b.is_ascii_digit()));
        assert!(matches!(candidate.len(), 44 | 47 | 48));
    }
});

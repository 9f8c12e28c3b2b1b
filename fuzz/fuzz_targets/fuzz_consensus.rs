#![no_main]

use libfuzzer_sys::fuzz_target;
use linha_core::{ConsensusBuffer, ConsensusVerdict, RawCandidate, ReadSource, validate};
use std::time::Instant;

fuzz_target!(|data: &[u8]| {
    let Some((&depth, rest)) = data.split_first() else {
        return;
    };
    let mut buffer = ConsensusBuffer::new(depth as usize);
    for chunk in rest.chunks(48) {
        let digits: String = chunk.iter().map(|b| char::from(b'0' + b % 10)).collect();
        let candidate = RawCandidate::new(digits, ReadSource::Barcode, Instant::now());
        if let ConsensusVerdict::Confirmed(line) = buffer.observe(candidate) {
            assert!(validate(line.as_str()));
        }
    }
});

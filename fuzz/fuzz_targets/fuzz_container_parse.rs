#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz the GBIT container parser with arbitrary bytes.
///
/// Malformed, truncated, corrupted and hostile inputs must only ever
/// produce `Ok` or `Err`, never a panic.
fuzz_target!(|data: &[u8]| {
    let _ = ghostbit::container::parse(data);
    let _ = ghostbit::container::parse_header(data);
});

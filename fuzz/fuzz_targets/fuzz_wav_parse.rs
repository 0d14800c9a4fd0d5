#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz the RIFF/WAVE parser with arbitrary bytes.
///
/// Truncated chunk lists, hostile sizes and missing fmt/data chunks must
/// all produce errors, never panics or out-of-bounds reads.
fuzz_target!(|data: &[u8]| {
    let _ = ghostbit::wav::parse(data.to_vec());
});

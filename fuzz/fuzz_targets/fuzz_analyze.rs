#![no_main]
use libfuzzer_sys::fuzz_target;

/// Fuzz the analyzer over raw sample streams.
///
/// The analyzer trial-extracts at every bit depth and must classify any
/// byte soup as either a located stream or "no hidden data". It never
/// raises and never panics. No password is supplied, so the expensive KDF
/// path is not reachable.
fuzz_target!(|data: &[u8]| {
    let header_len = if data.is_empty() { 0 } else { data[0] as usize % (data.len() + 1) };
    let _ = ghostbit::analyze::analyze(data, header_len, None);
});

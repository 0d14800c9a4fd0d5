//! Capacity estimation: how many payload bytes fit a carrier body.
//!
//! The public helper returns the generous plaintext (v0) figure with a
//! nominal name length per file; the coordinator enforces the exact check
//! against the real wrapped stream before embedding.

use crate::container::{FIXED_OVERHEAD, PER_FILE_OVERHEAD, STREAM_PREFIX_LEN};
use crate::QualityMode;

/// Name length assumed per file when the real names are not known yet.
const NOMINAL_NAME_LEN: usize = 32;

/// Container overhead estimate for `estimated_files` entries.
pub fn container_overhead(estimated_files: usize) -> usize {
    FIXED_OVERHEAD + estimated_files * (PER_FILE_OVERHEAD + NOMINAL_NAME_LEN)
}

/// Maximum payload bytes for a body of `body_bytes` carrier bytes at the
/// given quality, assuming `estimated_files` files and no envelope.
pub fn max_payload_bytes(
    body_bytes: usize,
    mode: QualityMode,
    estimated_files: usize,
) -> usize {
    let raw = body_bytes / mode.ratio();
    raw.saturating_sub(STREAM_PREFIX_LEN + container_overhead(estimated_files))
}

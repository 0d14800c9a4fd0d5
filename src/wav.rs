//! WAV transcoder collaborator: parse a RIFF/WAVE byte stream into a linear
//! PCM view and write it back out losslessly.
//!
//! The parser walks the chunk list only far enough to find `fmt ` and
//! `data`; every byte of the original file is kept verbatim, so writing the
//! (possibly modified) buffer back out is trivially lossless. Compressed
//! carriers are refused here; nothing lossy may reach the codec.

use std::path::Path;

use log::debug;

use crate::error::CodecError;
use crate::fsio;

const RIFF_ID: &[u8; 4] = b"RIFF";
const WAVE_ID: &[u8; 4] = b"WAVE";
const FMT_ID: &[u8; 4] = b"fmt ";
const DATA_ID: &[u8; 4] = b"data";

/// WAVE format tag for uncompressed PCM.
const FORMAT_PCM: u16 = 1;

/// A decoded carrier: the raw file bytes plus the location of the sample
/// body and the format fields the caller may want to display.
#[derive(Debug, Clone)]
pub struct PcmAudio {
    /// The entire file, header included.
    pub bytes: Vec<u8>,
    /// Byte offset of the `data` chunk payload; everything before it is
    /// never modified.
    pub header_len: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmAudio {
    /// Sample bytes available for LSB embedding.
    pub fn body_len(&self) -> usize {
        self.bytes.len() - self.header_len
    }
}

/// Parse a RIFF/WAVE byte stream.
pub fn parse(bytes: Vec<u8>) -> Result<PcmAudio, CodecError> {
    if bytes.len() < 12 || &bytes[0..4] != RIFF_ID || &bytes[8..12] != WAVE_ID {
        return Err(CodecError::Format("not a RIFF/WAVE file"));
    }

    let mut fmt: Option<(u16, u32, u16)> = None; // channels, rate, bits
    let mut pos = 12usize;

    while pos + 8 <= bytes.len() {
        let id: [u8; 4] = bytes[pos..pos + 4].try_into().unwrap();
        let size = u32::from_le_bytes(bytes[pos + 4..pos + 8].try_into().unwrap()) as usize;
        debug!("chunk {:?} at {pos}, {size} bytes", String::from_utf8_lossy(&id));

        if &id == DATA_ID {
            let (channels, sample_rate, bits_per_sample) =
                fmt.ok_or(CodecError::Format("data chunk before fmt chunk"))?;
            let header_len = pos + 8;
            if header_len > bytes.len() {
                return Err(CodecError::Format("malformed WAV chunk"));
            }
            return Ok(PcmAudio {
                bytes,
                header_len,
                sample_rate,
                channels,
                bits_per_sample,
            });
        }

        let body = pos + 8;
        let end = body.checked_add(size).ok_or(CodecError::Format("malformed WAV chunk"))?;
        if end > bytes.len() {
            return Err(CodecError::Format("malformed WAV chunk"));
        }

        if &id == FMT_ID {
            if size < 16 {
                return Err(CodecError::Format("fmt chunk too short"));
            }
            let audio_format = u16::from_le_bytes(bytes[body..body + 2].try_into().unwrap());
            if audio_format != FORMAT_PCM {
                return Err(CodecError::Format(
                    "only uncompressed PCM carriers are supported",
                ));
            }
            let channels = u16::from_le_bytes(bytes[body + 2..body + 4].try_into().unwrap());
            let sample_rate = u32::from_le_bytes(bytes[body + 4..body + 8].try_into().unwrap());
            let bits_per_sample =
                u16::from_le_bytes(bytes[body + 14..body + 16].try_into().unwrap());
            if !matches!(bits_per_sample, 8 | 16 | 24 | 32) {
                return Err(CodecError::Format("unsupported sample width"));
            }
            fmt = Some((channels, sample_rate, bits_per_sample));
        }

        // Chunks are word-aligned; odd sizes carry a pad byte.
        pos = end + (size & 1);
    }

    Err(CodecError::Format("no data chunk found"))
}

/// Read and parse a WAV file.
pub fn read(path: &Path) -> Result<PcmAudio, CodecError> {
    let bytes = std::fs::read(path)?;
    debug!("read {} bytes from {}", bytes.len(), path.display());
    parse(bytes)
}

/// Write a (possibly modified) WAV byte stream atomically.
pub fn write(path: &Path, bytes: &[u8]) -> Result<(), CodecError> {
    fsio::write_atomic(path, bytes)
}

//! GhostBit core library.
//!
//! This crate provides the primitives for hiding files in WAV audio:
//! - LSB codec over a linear PCM sample stream (1, 2 or 4 bits per byte)
//! - Self-describing multi-file container with per-file CRC-32
//! - Versioned encryption envelope (Argon2id + AES-256-GCM; legacy
//!   AES-256-CBC/HMAC read path)
//! - Analyzer that reports hidden content without extracting it
//! - Lossless RIFF/WAVE parsing and atomic output writes
//!
//! The byte-level pipelines live in [`coder`]; the functions here wrap them
//! with file I/O for callers that work in paths.

pub mod analyze;
pub mod bits;
pub mod capacity;
pub mod codec;
pub mod coder;
pub mod container;
pub mod crypto;
pub mod error;
pub mod fsio;
pub mod wav;

pub use analyze::{FileSummary, Report};
pub use coder::{
    Control, NoPasswordSource, NoProgress, PasswordProvider, PasswordResponse, ProgressSink,
};
pub use error::CodecError;

use std::path::{Path, PathBuf};

/// How many carrier bits each payload bit costs. Higher quality spreads the
/// payload thinner and disturbs the audio less.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityMode {
    /// 1 payload bit per 2 sample bits (`k = 4`).
    Low,
    /// 1 payload bit per 4 sample bits (`k = 2`).
    Normal,
    /// 1 payload bit per 8 sample bits (`k = 1`).
    High,
}

impl QualityMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    /// Carrier bytes consumed per payload byte.
    pub fn ratio(&self) -> usize {
        match self {
            Self::Low => 2,
            Self::Normal => 4,
            Self::High => 8,
        }
    }

    /// Low bits used in each carrier byte (`k`).
    pub fn bits_per_byte(&self) -> u32 {
        match self {
            Self::Low => 4,
            Self::Normal => 2,
            Self::High => 1,
        }
    }
}

impl std::fmt::Display for QualityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which envelope wraps the embedded container. The same value appears as
/// the stream's leading version tag and as the sixth container byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherVersion {
    /// No encryption; the container is embedded as-is.
    Plain,
    /// AES-256-CBC + HMAC-SHA256. Decode only.
    AesCbcLegacy,
    /// AES-256-GCM. The only version new encodes produce.
    AesGcm,
}

impl CipherVersion {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Plain),
            1 => Some(Self::AesCbcLegacy),
            2 => Some(Self::AesGcm),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::AesCbcLegacy => 1,
            Self::AesGcm => 2,
        }
    }
}

impl std::fmt::Display for CipherVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plain => "plaintext",
            Self::AesCbcLegacy => "AES-256-CBC (legacy)",
            Self::AesGcm => "AES-256-GCM",
        })
    }
}

/// A secret file: its bare name (no path components) and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Hide `secrets` inside `carrier` and write the result to `output`.
pub fn encode(
    carrier: &Path,
    secrets: &[PathBuf],
    output: &Path,
    mode: QualityMode,
    password: Option<&str>,
    sink: &mut dyn ProgressSink,
) -> Result<(), CodecError> {
    let pcm = wav::read(carrier)?;

    let mut files = Vec::with_capacity(secrets.len());
    for path in secrets {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(CodecError::Format("secret file name is not valid UTF-8"))?
            .to_string();
        container::validate_name(&name)?;
        files.push(SecretFile {
            name,
            data: std::fs::read(path)?,
        });
    }

    let encoded = coder::encode(&pcm.bytes, pcm.header_len, &files, mode, password, sink)?;
    wav::write(output, &encoded)
}

/// Extract all hidden files from `input` into `output_dir`.
///
/// Files land on disk only after the full container has parsed; each is
/// written to a temp name and atomically renamed.
pub fn decode(
    input: &Path,
    output_dir: &Path,
    password: Option<&str>,
    provider: &mut dyn PasswordProvider,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<PathBuf>, CodecError> {
    let pcm = wav::read(input)?;
    let files = coder::decode(&pcm.bytes, pcm.header_len, password, provider, sink)?;

    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::with_capacity(files.len());
    for file in &files {
        let path = output_dir.join(&file.name);
        fsio::write_atomic(&path, &file.data)?;
        written.push(path);
    }
    Ok(written)
}

/// Inspect `input` for hidden data without writing anything.
pub fn analyze_file(input: &Path, password: Option<&str>) -> Result<Report, CodecError> {
    let pcm = wav::read(input)?;
    Ok(analyze::analyze(&pcm.bytes, pcm.header_len, password))
}

/// Estimated payload capacity of `carrier` at the given quality.
pub fn capacity(carrier: &Path, mode: QualityMode) -> Result<usize, CodecError> {
    let pcm = wav::read(carrier)?;
    Ok(capacity::max_payload_bytes(pcm.body_len(), mode, 1))
}

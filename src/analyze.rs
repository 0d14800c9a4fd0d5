//! Analyzer: inspect an encoded sample stream and report what is hidden in
//! it, without writing any payload to disk.
//!
//! The analyzer never raises. A stream that does not validate down to the
//! container magic / end marker reports as "no hidden data"; deeper
//! corruption (bad CRC, failed decryption with a supplied password) is
//! reported through the `corrupt` flag.

use log::debug;

use crate::coder::locate_stream;
use crate::error::CodecError;
use crate::{container, crypto};
use crate::{CipherVersion, QualityMode};

/// Name and size of one hidden file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub size: u64,
}

/// What the analyzer found.
#[derive(Debug, Default)]
pub struct Report {
    /// A plausible embedded stream was located.
    pub hidden_data: bool,
    /// Bit depth the stream was found at.
    pub quality: Option<QualityMode>,
    /// Cipher version from the stream tag.
    pub cipher: Option<CipherVersion>,
    /// Size of the embedded blob (envelope or plaintext container) in bytes.
    pub payload_len: Option<u64>,
    /// Hidden file listing; empty when the stream is encrypted and no
    /// password was supplied, or when the container is corrupt.
    pub files: Vec<FileSummary>,
    /// The stream was located but its contents failed validation.
    pub corrupt: bool,
}

impl Report {
    fn no_data() -> Self {
        Self::default()
    }
}

/// Inspect `samples` for hidden data. An optional password unlocks the file
/// listing of encrypted streams.
pub fn analyze(samples: &[u8], header_len: usize, password: Option<&str>) -> Report {
    if header_len > samples.len() {
        return Report::no_data();
    }
    let body = &samples[header_len..];

    let stream = match locate_stream(body) {
        Ok(Some(s)) => s,
        Ok(None) | Err(_) => return Report::no_data(),
    };

    let mut report = Report {
        hidden_data: true,
        quality: Some(stream.mode),
        cipher: Some(stream.cipher),
        payload_len: Some(stream.blob.len() as u64),
        files: Vec::new(),
        corrupt: false,
    };

    match stream.cipher {
        CipherVersion::Plain => match container::parse(&stream.blob) {
            Ok(manifest) => report.files = summarize(&manifest),
            // Structural failures mean this was never a real stream.
            Err(CodecError::Format("bad magic")) | Err(CodecError::Format("bad end marker")) => {
                return Report::no_data();
            }
            Err(e) => {
                debug!("plaintext container failed validation: {e}");
                report.corrupt = true;
            }
        },
        version => {
            let Some(pw) = password else {
                // Locked: report version and envelope size only.
                return report;
            };
            match crypto::open(&stream.blob, pw.as_bytes(), version)
                .and_then(|plain| container::parse(&plain))
            {
                Ok(manifest) => report.files = summarize(&manifest),
                Err(e) => {
                    debug!("encrypted stream failed to open: {e}");
                    report.corrupt = true;
                }
            }
        }
    }

    report
}

fn summarize(manifest: &container::Manifest) -> Vec<FileSummary> {
    manifest
        .files
        .iter()
        .map(|f| FileSummary {
            name: f.name.clone(),
            size: f.data.len() as u64,
        })
        .collect()
}

//! Error types for the steganographic codec.
//!
//! [`CodecError`] covers every failure mode from WAV parsing through
//! container validation and envelope authentication. The CLI maps each
//! variant onto a process exit code; see `main.rs`.

use core::fmt;

use crate::CipherVersion;

/// Single fixed message for every authentication failure.
///
/// Wrong password, truncated envelope, flipped tag byte and flipped
/// ciphertext byte must all read identically so the error reveals nothing
/// about which check failed.
pub(crate) const AUTH_MESSAGE: &str =
    "authentication failed (wrong password or modified carrier)";

/// Errors that can occur while embedding, extracting or analyzing.
#[derive(Debug)]
pub enum CodecError {
    /// The wrapped payload stream does not fit the carrier body.
    Capacity { required: usize, available: usize },
    /// Malformed container: bad magic, version, CRC, end marker, name.
    Format(&'static str),
    /// KDF/decrypt/tag failure. One fixed message for every cause.
    Auth,
    /// Encrypted data found but no password was available.
    KeyRequired(CipherVersion),
    /// The operation was cancelled through a callback.
    Cancelled,
    /// The analyzer/decoder found no hidden payload.
    NoData,
    /// I/O failure from a filesystem collaborator.
    Io(std::io::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity {
                required,
                available,
            } => write!(
                f,
                "payload too large for carrier: need {required} bytes, have {available}"
            ),
            Self::Format(reason) => write!(f, "malformed container: {reason}"),
            Self::Auth => f.write_str(AUTH_MESSAGE),
            Self::KeyRequired(v) => {
                write!(f, "carrier is encrypted ({v}); a password is required")
            }
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::NoData => f.write_str("no hidden data found"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

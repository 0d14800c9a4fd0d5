//! Coordinator: end-to-end encode and decode pipelines over a linear PCM
//! sample stream.
//!
//! Encode: build the container, seal it when a password is given, frame it
//! with the `VERSION_TAG | TOTAL_LEN` prefix, verify capacity, then thread
//! the stream through the low bits of a copy of the carrier. The input
//! buffer is never modified; the first `header_len` bytes of the copy are
//! byte-identical to the input.
//!
//! Decode: the quality mode is not recorded anywhere, so the reader trials
//! each bit depth and keeps the first candidate whose stream prefix is
//! plausible: a valid tag, an in-range length, and for plaintext streams
//! a matching container magic. An implausible prefix at every depth
//! means there is nothing embedded.

use log::{debug, info};
use zeroize::Zeroizing;

use crate::container::{self, STREAM_PREFIX_LEN};
use crate::error::CodecError;
use crate::{codec, crypto};
use crate::{CipherVersion, QualityMode, SecretFile};

/// What a progress callback wants the pipeline to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Cancel,
}

/// Observer for per-file pipeline progress. Callbacks run synchronously
/// between files; returning [`Control::Cancel`] aborts the operation with
/// [`CodecError::Cancelled`] before the next file is touched.
pub trait ProgressSink {
    fn on_encoded(&mut self, _name: &str, _index: usize, _total: usize) -> Control {
        Control::Continue
    }
    fn on_decoded(&mut self, _name: &str, _index: usize, _total: usize) -> Control {
        Control::Continue
    }
}

/// Sink that ignores all events.
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Outcome of asking a [`PasswordProvider`] for a password.
pub enum PasswordResponse {
    Password(Zeroizing<String>),
    /// No password can be supplied; the caller gets [`CodecError::KeyRequired`].
    Unavailable,
    /// The user declined; the caller gets [`CodecError::Cancelled`].
    Cancelled,
}

/// Invoked when an encrypted stream is met and no password was passed in.
pub trait PasswordProvider {
    fn request(&mut self, version: CipherVersion) -> PasswordResponse;
}

/// Provider for non-interactive callers: never supplies a password.
pub struct NoPasswordSource;

impl PasswordProvider for NoPasswordSource {
    fn request(&mut self, _version: CipherVersion) -> PasswordResponse {
        PasswordResponse::Unavailable
    }
}

/// Embed `files` into a copy of `samples`, leaving the first `header_len`
/// bytes untouched. Returns the full modified buffer, same length as the
/// input.
pub fn encode(
    samples: &[u8],
    header_len: usize,
    files: &[SecretFile],
    mode: QualityMode,
    password: Option<&str>,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<u8>, CodecError> {
    if header_len > samples.len() {
        return Err(CodecError::Format("header longer than sample stream"));
    }
    let k = mode.bits_per_byte();
    let body_len = samples.len() - header_len;

    let cipher = if password.is_some() {
        CipherVersion::AesGcm
    } else {
        CipherVersion::Plain
    };

    for (index, file) in files.iter().enumerate() {
        container::validate_name(&file.name)?;
        if sink.on_encoded(&file.name, index, files.len()) == Control::Cancel {
            return Err(CodecError::Cancelled);
        }
    }

    let plain = Zeroizing::new(container::serialize(files, cipher)?);
    let blob = match password {
        Some(pw) => crypto::seal(&plain, pw.as_bytes())?,
        None => plain.to_vec(),
    };
    let wrapped = container::wrap_stream(&blob, cipher);

    let available_bits = body_len * k as usize;
    if wrapped.len() * 8 > available_bits {
        return Err(CodecError::Capacity {
            required: wrapped.len(),
            available: available_bits / 8,
        });
    }

    info!(
        "embedding {} file(s), {} stream bytes into {} body bytes at {} bit(s)/byte",
        files.len(),
        wrapped.len(),
        body_len,
        k
    );

    let mut out = samples.to_vec();
    codec::embed(&mut out[header_len..], &wrapped, k)?;
    Ok(out)
}

/// A located embedded stream: the bit depth it was found at, the cipher tag,
/// and the raw blob (envelope or plaintext container).
pub(crate) struct LocatedStream {
    pub mode: QualityMode,
    pub cipher: CipherVersion,
    pub blob: Vec<u8>,
}

/// Trial-extract the stream prefix at each bit depth and return the first
/// plausible candidate. `None` means no hidden data.
pub(crate) fn locate_stream(body: &[u8]) -> Result<Option<LocatedStream>, CodecError> {
    for mode in [QualityMode::High, QualityMode::Normal, QualityMode::Low] {
        let k = mode.bits_per_byte();
        let capacity_bytes = body.len() * k as usize / 8;
        if capacity_bytes < STREAM_PREFIX_LEN {
            continue;
        }

        let prefix = codec::extract(body, k, STREAM_PREFIX_LEN * 8)?;
        let (tag, total_len) = container::read_stream_prefix(&prefix)
            .expect("prefix has exactly STREAM_PREFIX_LEN bytes");

        let Some(cipher) = CipherVersion::from_tag(tag) else {
            debug!("k={k}: tag {tag} not a cipher version, skipping");
            continue;
        };
        let Ok(total_len) = usize::try_from(total_len) else {
            continue;
        };
        if total_len == 0 || total_len > capacity_bytes - STREAM_PREFIX_LEN {
            debug!("k={k}: implausible stream length {total_len}, skipping");
            continue;
        }

        // The prefix occupies a whole number of body bytes for every k.
        let consumed = STREAM_PREFIX_LEN * 8 / k as usize;
        let blob = codec::extract(&body[consumed..], k, total_len * 8)?;

        // A plaintext candidate must also lead with the container magic;
        // an encrypted one is accepted on the prefix alone.
        if cipher == CipherVersion::Plain
            && blob.get(..container::MAGIC.len()) != Some(&container::MAGIC[..])
        {
            debug!("k={k}: plausible prefix but no container magic, skipping");
            continue;
        }

        info!("found {cipher} stream at {k} bit(s)/byte, {total_len} bytes");
        return Ok(Some(LocatedStream { mode, cipher, blob }));
    }
    Ok(None)
}

fn resolve_password(
    password: Option<&str>,
    provider: &mut dyn PasswordProvider,
    version: CipherVersion,
) -> Result<Zeroizing<String>, CodecError> {
    if let Some(pw) = password {
        return Ok(Zeroizing::new(pw.to_string()));
    }
    match provider.request(version) {
        PasswordResponse::Password(pw) => Ok(pw),
        PasswordResponse::Unavailable => Err(CodecError::KeyRequired(version)),
        PasswordResponse::Cancelled => Err(CodecError::Cancelled),
    }
}

/// Extract all hidden files from a sample stream.
///
/// The password provider is consulted only when the stream is encrypted and
/// `password` is `None`.
pub fn decode(
    samples: &[u8],
    header_len: usize,
    password: Option<&str>,
    provider: &mut dyn PasswordProvider,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<SecretFile>, CodecError> {
    if header_len > samples.len() {
        return Err(CodecError::Format("header longer than sample stream"));
    }
    let body = &samples[header_len..];

    let Some(stream) = locate_stream(body)? else {
        return Err(CodecError::NoData);
    };

    let manifest = match stream.cipher {
        CipherVersion::Plain => container::parse(&stream.blob)?,
        version => {
            let pw = resolve_password(password, provider, version)?;
            let plain = crypto::open(&stream.blob, pw.as_bytes(), version)?;
            container::parse(&plain)?
        }
    };

    // The tag outside the envelope and the byte inside the container must
    // tell the same story.
    if manifest.cipher != stream.cipher {
        return Err(CodecError::Format("cipher version mismatch"));
    }

    let total = manifest.files.len();
    for (index, file) in manifest.files.iter().enumerate() {
        if sink.on_decoded(&file.name, index, total) == Control::Cancel {
            return Err(CodecError::Cancelled);
        }
    }

    info!("extracted {total} file(s)");
    Ok(manifest.files)
}

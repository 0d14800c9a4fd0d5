//! GBIT container: serialises a manifest of secret files into a single byte
//! blob, and parses the same with strict validation.
//!
//! ```text
//! MAGIC "GBIT" (4) | VERSION=1 (1) | CIPHER_VERSION (1) | FILE_COUNT u16 BE
//! | entries… | END_MARKER "ENDB" (4)
//!
//! entry: NAME_LEN u16 BE | NAME utf-8 | DATA_LEN u64 BE | DATA | CRC32 u32 BE
//! ```
//!
//! The CRC covers `DATA` only. All integers are big-endian. The blob that is
//! ultimately embedded into the carrier body is framed as
//! `VERSION_TAG (1) | TOTAL_LEN u64 BE | BLOB`, where the blob is either the
//! envelope (tags 1/2) or this serialised container (tag 0).

use subtle::ConstantTimeEq;

use crate::error::CodecError;
use crate::{CipherVersion, SecretFile};

pub const MAGIC: &[u8; 4] = b"GBIT";
pub const END_MARKER: &[u8; 4] = b"ENDB";
pub const VERSION: u8 = 1;

pub const MAX_NAME_LEN: usize = 1024;
pub const MAX_DATA_LEN: u64 = 1 << 47;
pub const MAX_FILE_COUNT: usize = u16::MAX as usize;

/// magic + version + cipher + count + end marker.
pub const FIXED_OVERHEAD: usize = 4 + 1 + 1 + 2 + 4;
/// name_len + data_len + crc, name itself excluded.
pub const PER_FILE_OVERHEAD: usize = 2 + 8 + 4;
/// version tag + total length, prepended to the embedded bit-stream.
pub const STREAM_PREFIX_LEN: usize = 1 + 8;

/// Fully parsed container.
#[derive(Debug)]
pub struct Manifest {
    pub cipher: CipherVersion,
    pub files: Vec<SecretFile>,
}

/// Leading fields only, enough for the analyzer to report on.
#[derive(Debug, Clone, Copy)]
pub struct HeaderInfo {
    pub cipher: CipherVersion,
    pub file_count: u16,
}

/// Reject names that are empty, oversized, or could escape the output
/// directory when written back out.
pub fn validate_name(name: &str) -> Result<(), CodecError> {
    if name.is_empty() {
        return Err(CodecError::Format("empty file name"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CodecError::Format("file name too long"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(CodecError::Format("file name contains a path separator"));
    }
    Ok(())
}

/// Exact serialised size of the container for these files.
pub fn serialized_len(files: &[SecretFile]) -> usize {
    FIXED_OVERHEAD
        + files
            .iter()
            .map(|f| PER_FILE_OVERHEAD + f.name.len() + f.data.len())
            .sum::<usize>()
}

/// Serialise a manifest. `cipher` records which envelope will wrap the blob.
pub fn serialize(files: &[SecretFile], cipher: CipherVersion) -> Result<Vec<u8>, CodecError> {
    if files.is_empty() {
        return Err(CodecError::Format("container holds no files"));
    }
    if files.len() > MAX_FILE_COUNT {
        return Err(CodecError::Format("too many files"));
    }
    for f in files {
        validate_name(&f.name)?;
        if f.data.len() as u64 > MAX_DATA_LEN {
            return Err(CodecError::Format("file length out of range"));
        }
    }

    let mut out = Vec::with_capacity(serialized_len(files));
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.push(cipher.as_tag());
    out.extend_from_slice(&(files.len() as u16).to_be_bytes());
    for f in files {
        out.extend_from_slice(&(f.name.len() as u16).to_be_bytes());
        out.extend_from_slice(f.name.as_bytes());
        out.extend_from_slice(&(f.data.len() as u64).to_be_bytes());
        out.extend_from_slice(&f.data);
        out.extend_from_slice(&crc32fast::hash(&f.data).to_be_bytes());
    }
    out.extend_from_slice(END_MARKER);
    Ok(out)
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::Format(what));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn u16_be(&mut self, what: &'static str) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.take(2, what)?.try_into().unwrap()))
    }

    fn u32_be(&mut self, what: &'static str) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.take(4, what)?.try_into().unwrap()))
    }

    fn u64_be(&mut self, what: &'static str) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.take(8, what)?.try_into().unwrap()))
    }
}

fn parse_leading(r: &mut Reader<'_>) -> Result<HeaderInfo, CodecError> {
    let magic = r.take(4, "container truncated")?;
    if magic.ct_eq(MAGIC).unwrap_u8() != 1 {
        return Err(CodecError::Format("bad magic"));
    }
    let version = r.take(1, "container truncated")?[0];
    if version != VERSION {
        return Err(CodecError::Format("unsupported container version"));
    }
    let cipher = CipherVersion::from_tag(r.take(1, "container truncated")?[0])
        .ok_or(CodecError::Format("unknown cipher version"))?;
    let file_count = r.u16_be("container truncated")?;
    if file_count == 0 {
        return Err(CodecError::Format("container holds no files"));
    }
    Ok(HeaderInfo { cipher, file_count })
}

/// Parse the leading fields only; used by the analyzer to decide whether a
/// candidate blob is a container at all before it commits to a full parse.
pub fn parse_header(bytes: &[u8]) -> Result<HeaderInfo, CodecError> {
    parse_leading(&mut Reader::new(bytes))
}

/// Strict full parse: every entry is validated (name, bounds, CRC) and the
/// end marker must close the blob exactly.
pub fn parse(bytes: &[u8]) -> Result<Manifest, CodecError> {
    let mut r = Reader::new(bytes);
    let header = parse_leading(&mut r)?;

    let mut files = Vec::with_capacity(header.file_count as usize);
    for _ in 0..header.file_count {
        let name_len = r.u16_be("entry truncated")? as usize;
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(CodecError::Format("file name length out of range"));
        }
        let name = std::str::from_utf8(r.take(name_len, "entry truncated")?)
            .map_err(|_| CodecError::Format("file name is not valid UTF-8"))?
            .to_string();
        validate_name(&name)?;

        let data_len = r.u64_be("entry truncated")?;
        if data_len > MAX_DATA_LEN {
            return Err(CodecError::Format("file length out of range"));
        }
        if data_len > r.remaining() as u64 {
            return Err(CodecError::Format("entry truncated"));
        }
        let data = r.take(data_len as usize, "entry truncated")?.to_vec();

        let stored_crc = r.u32_be("entry truncated")?;
        if crc32fast::hash(&data) != stored_crc {
            return Err(CodecError::Format("file data CRC mismatch"));
        }

        files.push(SecretFile { name, data });
    }

    let end = r.take(4, "missing end marker")?;
    if end.ct_eq(END_MARKER).unwrap_u8() != 1 {
        return Err(CodecError::Format("bad end marker"));
    }
    if r.remaining() != 0 {
        return Err(CodecError::Format("trailing bytes after end marker"));
    }

    Ok(Manifest {
        cipher: header.cipher,
        files,
    })
}

/// Frame a blob for embedding: `VERSION_TAG | TOTAL_LEN u64 BE | BLOB`.
pub fn wrap_stream(blob: &[u8], tag: CipherVersion) -> Vec<u8> {
    let mut out = Vec::with_capacity(STREAM_PREFIX_LEN + blob.len());
    out.push(tag.as_tag());
    out.extend_from_slice(&(blob.len() as u64).to_be_bytes());
    out.extend_from_slice(blob);
    out
}

/// Split a 9-byte stream prefix into `(tag, total_len)`. No sanity checks;
/// the caller decides what counts as plausible.
pub fn read_stream_prefix(prefix: &[u8]) -> Option<(u8, u64)> {
    if prefix.len() < STREAM_PREFIX_LEN {
        return None;
    }
    let tag = prefix[0];
    let total_len = u64::from_be_bytes(prefix[1..9].try_into().unwrap());
    Some((tag, total_len))
}

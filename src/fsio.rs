//! Atomic file output: write to a temp name in the target directory, then
//! rename into place. A decode that fails part-way leaves nothing behind.

use std::io::Write;
use std::path::Path;

use crate::error::CodecError;

/// Write `data` to `path` atomically.
///
/// The temp file uses a random suffix to avoid predictable names and
/// collisions, and is created with `create_new` so an existing temp file is
/// never silently clobbered.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CodecError> {
    let suffix = {
        let mut buf = [0u8; 8];
        getrandom::getrandom(&mut buf)
            .map_err(|e| CodecError::Io(std::io::Error::other(format!("getrandom: {e:?}"))))?;
        buf.iter().map(|b| format!("{b:02x}")).collect::<String>()
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".tmp.{suffix}"));
    let tmp = std::path::PathBuf::from(tmp);

    let result = (|| {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result.map_err(CodecError::Io)
}

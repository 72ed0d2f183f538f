//! Explicit filesystem helpers for the places where a vanished file is an
//! expected outcome rather than an error.

use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Rename `from` to `to`. Returns `Ok(false)` when `from` no longer exists.
pub fn safe_rename(from: &Path, to: &Path) -> Result<bool> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(from = %from.display(), "rename source missing");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove `path`. Returns `Ok(false)` when it was already gone.
pub fn safe_unlink(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Read a text artifact, replacing invalid UTF-8.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write `contents` next to `dest` and move it into place, so a crash never
/// leaves a half-written artifact under the final name.
pub fn write_atomic(dest: &Path, contents: &str) -> Result<()> {
    let tmp = dest.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    if !safe_rename(&tmp, dest)? {
        std::fs::write(dest, contents)?;
    }
    Ok(())
}

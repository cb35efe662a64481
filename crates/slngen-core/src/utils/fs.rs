//! Atomic file output.
//!
//! Generated solutions and rewritten project files are rendered fully in
//! memory, written to a temporary file next to the destination and then
//! renamed over it, so a failed run never leaves a truncated file behind.

use crate::error::{SlnError, SlnResult};
use std::io::Write;
use std::path::Path;

/// Atomically replace `path` with `contents`.
///
/// Permissions of an existing destination are carried over.
pub fn write_atomic(path: &Path, contents: &[u8]) -> SlnResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let write_err = |source: std::io::Error| SlnError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(contents).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;

    match std::fs::metadata(path) {
        Ok(existing) => temp
            .as_file()
            .set_permissions(existing.permissions())
            .map_err(write_err)?,
        Err(_) => set_default_permissions(temp.as_file()).map_err(write_err)?,
    }

    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn set_default_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

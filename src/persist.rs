//! File I/O for stores: read-if-present and whole-file overwrite.
//!
//! Writes hold an exclusive advisory lock on the target for their duration,
//! so two cooperating writers never interleave. Readers do not take the
//! lock: a reader racing a writer can observe a truncated file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::StoreError;

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a file's full contents, or `None` if it does not exist.
pub fn read_existing(path: &Path) -> Result<Option<String>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(c) => Ok(Some(c)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path, e)),
    }
}

/// Replace a file's contents under an exclusive lock.
/// Creates parent directories if needed.
pub fn write_locked(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    // Truncating on open would clobber the file before the lock is held.
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| io_error(path, e))?;

    file.lock().map_err(|e| io_error(path, e))?;
    let written = overwrite(&mut file, content);
    let unlocked = file.unlock();

    written.map_err(|e| io_error(path, e))?;
    unlocked.map_err(|e| io_error(path, e))
}

fn overwrite(file: &mut File, content: &str) -> std::io::Result<()> {
    file.set_len(0)?;
    file.write_all(content.as_bytes())?;
    file.flush()
}

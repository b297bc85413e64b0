//! Last-built commit marker.
//!
//! A single plain-text file at `<working-copy>/.last_commit` holding the commit
//! that was last built successfully. Writes use the `.tmp` + rename pattern so
//! a crash mid-write never leaves a truncated marker behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, MarkerError};
use crate::types::CommitId;

/// File name of the marker inside the working copy.
pub const MARKER_FILE: &str = ".last_commit";

/// `<working_copy>/.last_commit`. Pure, no I/O.
pub fn marker_path_at(working_copy: &Path) -> PathBuf {
    working_copy.join(MARKER_FILE)
}

/// Read the marker for `working_copy`.
///
/// Returns `Ok(None)` when the file does not exist or holds only whitespace.
pub fn read_at(working_copy: &Path) -> Result<Option<CommitId>, MarkerError> {
    let path = marker_path_at(working_copy);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(&path, err)),
    };
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(CommitId::from(trimmed)))
}

/// Overwrite the marker for `working_copy` with `commit`.
///
/// Writes the bare identifier to `.last_commit.tmp` then renames it into place.
pub fn write_at(working_copy: &Path, commit: &CommitId) -> Result<(), MarkerError> {
    let path = marker_path_at(working_copy);
    let tmp = working_copy.join(format!("{MARKER_FILE}.tmp"));
    std::fs::write(&tmp, commit.as_str().trim()).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

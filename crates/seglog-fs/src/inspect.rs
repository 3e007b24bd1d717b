//! Cheap existence and emptiness checks used during recovery

use crate::names;
use seglog_common::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;

/// Whether an entry called `name` exists in `dir`
///
/// A missing entry is `Ok(false)`; any other stat failure is an error.
pub fn file_exists(dir: &Path, name: &str) -> Result<bool> {
    let path = names::join(dir, name)?;
    match fs::metadata(&path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io("stat", path, e)),
    }
}

/// Whether the file `name` in `dir` has zero length
pub fn file_is_empty(dir: &Path, name: &str) -> Result<bool> {
    let path = names::join(dir, name)?;
    let meta = fs::metadata(&path).map_err(|e| Error::io("stat", &path, e))?;
    Ok(meta.len() == 0)
}

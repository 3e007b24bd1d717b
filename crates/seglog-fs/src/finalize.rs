//! Segment removal and finalization

use crate::dir::sync_dir;
use crate::names;
use seglog_common::{Error, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::debug;

/// Unlink `name` from `dir`
pub fn remove_file(dir: &Path, name: &str) -> Result<()> {
    let path = names::join(dir, name)?;
    fs::remove_file(&path).map_err(|e| Error::io("unlink", &path, e))?;
    debug!("Removed {}", path.display());
    Ok(())
}

/// Shrink `name1` to `size` bytes and rename it to `name2`
///
/// The file is truncated and flushed under its old name, which only the
/// caller uses, before it is renamed; the new name therefore only ever
/// refers to the final, shortened content. The directory is synced after
/// the rename. An existing `name2` is replaced.
pub fn truncate_and_rename_file(dir: &Path, size: u64, name1: &str, name2: &str) -> Result<()> {
    let path1 = names::join(dir, name1)?;
    let path2 = names::join_new(dir, name2)?;

    {
        let file = OpenOptions::new()
            .write(true)
            .open(&path1)
            .map_err(|e| Error::io("open", &path1, e))?;

        let current = file
            .metadata()
            .map_err(|e| Error::io("stat", &path1, e))?
            .len();
        if size > current {
            return Err(Error::invalid_argument(format!(
                "cannot truncate {} to {} bytes: file holds only {}",
                path1.display(),
                size,
                current
            )));
        }

        file.set_len(size).map_err(|e| Error::io("truncate", &path1, e))?;
        file.sync_all().map_err(|e| Error::io("fsync", &path1, e))?;
    }

    fs::rename(&path1, &path2).map_err(|e| Error::io("rename", &path1, e))?;
    sync_dir(dir)?;

    debug!(
        "Finalized {} as {} ({} bytes)",
        path1.display(),
        path2.display(),
        size
    );
    Ok(())
}

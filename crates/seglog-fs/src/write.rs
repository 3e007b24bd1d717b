//! One-shot durable file writes
//!
//! Content is first written to a temporary file in the same directory and
//! flushed, then published under its final name. A crash at any point
//! leaves either no target or a complete one, never a partial write.

use crate::allocate::discard;
use crate::dir::sync_dir;
use crate::names;
use seglog_common::{BufferSet, Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, IoSlice, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of the temporary file used while writing `name`
pub const TMP_FILE_PREFIX: &str = ".tmp-";

/// Create `name` in `dir` holding exactly the bytes of `bufs`
///
/// Fails with an already-exists error if `name` is taken; an existing file
/// is never modified.
pub fn make_file(dir: &Path, name: &str, bufs: &BufferSet) -> Result<()> {
    let path = names::join_new(dir, name)?;
    let tmp_path = write_temp(dir, name, bufs)?;

    // A hard link publishes the content without clobbering an existing entry.
    if let Err(e) = fs::hard_link(&tmp_path, &path) {
        discard(&tmp_path);
        return Err(Error::io("link", &path, e));
    }
    // The target is published at this point; a leftover temporary only
    // costs space and is cleared by the next write of `name`.
    discard(&tmp_path);
    sync_dir(dir)?;

    debug!("Created {} ({} bytes)", path.display(), bufs.len());
    Ok(())
}

/// Create or atomically replace `name` in `dir` with the bytes of `bufs`
pub fn make_or_replace_file(dir: &Path, name: &str, bufs: &BufferSet) -> Result<()> {
    let path = names::join_new(dir, name)?;
    let tmp_path = write_temp(dir, name, bufs)?;

    if let Err(e) = fs::rename(&tmp_path, &path) {
        discard(&tmp_path);
        return Err(Error::io("rename", &path, e));
    }
    sync_dir(dir)?;

    debug!("Wrote {} ({} bytes)", path.display(), bufs.len());
    Ok(())
}

/// Write `bufs` into a fresh temporary file for `name` and flush it
fn write_temp(dir: &Path, name: &str, bufs: &BufferSet) -> Result<PathBuf> {
    let tmp_path = dir.join(format!("{TMP_FILE_PREFIX}{name}"));

    // Leftover from an interrupted write
    match fs::remove_file(&tmp_path) {
        Ok(()) => debug!("Removed stale temporary file {}", tmp_path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io("unlink", &tmp_path, e)),
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .map_err(|e| Error::io("create", &tmp_path, e))?;

    let written = write_all_vectored(&mut file, bufs)
        .map_err(|e| Error::io("write", &tmp_path, e))
        .and_then(|()| file.sync_all().map_err(|e| Error::io("fsync", &tmp_path, e)));
    drop(file);

    if let Err(err) = written {
        discard(&tmp_path);
        return Err(err);
    }
    Ok(tmp_path)
}

/// Write every region of `bufs`, resubmitting after partial writes
pub(crate) fn write_all_vectored(file: &mut File, bufs: &BufferSet) -> io::Result<()> {
    let mut storage = bufs.io_slices();
    let mut slices = storage.as_mut_slice();
    IoSlice::advance_slices(&mut slices, 0);

    while !slices.is_empty() {
        match file.write_vectored(slices) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            Ok(n) => IoSlice::advance_slices(&mut slices, n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

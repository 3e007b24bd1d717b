//! Directory creation and metadata durability

use seglog_common::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Make sure `dir` exists as a directory, creating it if missing
///
/// Only the last path component is created; the parent must exist. A
/// concurrent creation of the same directory is not an error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => return Err(not_a_directory(dir)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io("stat", dir, e)),
    }

    match fs::create_dir(dir) {
        Ok(()) => {
            debug!("Created directory {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            // Lost a race with another creator; it must still be a directory.
            let meta = fs::metadata(dir).map_err(|e| Error::io("stat", dir, e))?;
            if meta.is_dir() {
                Ok(())
            } else {
                Err(not_a_directory(dir))
            }
        }
        Err(e) => Err(Error::io("mkdir", dir, e)),
    }
}

/// Flush the directory's entries to stable storage
///
/// Needed after creating, renaming or removing an entry before that change
/// can be considered durable.
pub fn sync_dir(dir: &Path) -> Result<()> {
    let handle = File::open(dir).map_err(|e| Error::io("open", dir, e))?;
    handle.sync_all().map_err(|e| Error::io("fsync", dir, e))
}

fn not_a_directory(dir: &Path) -> Error {
    Error::io(
        "stat",
        dir,
        io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use seglog_common::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_creates_missing() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("raft");

        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());

        // Second call is a no-op
        ensure_dir(&dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_is_not_recursive() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("missing").join("raft");

        let err = ensure_dir(&dir).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_ensure_dir_on_regular_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("plain");
        fs::write(&path, b"x").unwrap();

        let err = ensure_dir(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!err.is_already_exists());
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_sync_dir() {
        let tmp = tempdir().unwrap();
        sync_dir(tmp.path()).unwrap();

        let err = sync_dir(&tmp.path().join("gone")).unwrap_err();
        assert!(err.is_not_found());
    }
}

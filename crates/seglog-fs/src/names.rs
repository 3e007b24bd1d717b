//! File name validation
//!
//! Callers choose segment names; this layer only refuses names that
//! could escape the directory or overflow the temporary/probe prefixes.
//! Names starting with [`TMP_FILE_PREFIX`] or [`PROBE_FILE_PREFIX`] belong
//! to this layer: they can be read, checked and removed, but never created
//! by a caller.

use crate::probe::PROBE_FILE_PREFIX;
use crate::write::TMP_FILE_PREFIX;
use seglog_common::{Error, Result};
use std::path::{Path, PathBuf};

/// Longest accepted file name, in bytes
pub const MAX_FILENAME_LEN: usize = 128;

/// Check that `name` is a plain file name
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("file name is empty"));
    }
    if name.len() > MAX_FILENAME_LEN {
        return Err(Error::invalid_argument(format!(
            "file name is {} bytes long, max is {}",
            name.len(),
            MAX_FILENAME_LEN
        )));
    }
    if name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(Error::invalid_argument(format!(
            "invalid file name {name:?}"
        )));
    }
    Ok(())
}

/// Prefixes of the files this layer creates for its own use
pub const RESERVED_PREFIXES: [&str; 2] = [TMP_FILE_PREFIX, PROBE_FILE_PREFIX];

/// Check that `name` is a plain file name a caller may create
pub fn validate_new(name: &str) -> Result<()> {
    validate(name)?;
    if let Some(prefix) = RESERVED_PREFIXES.iter().find(|p| name.starts_with(**p)) {
        return Err(Error::invalid_argument(format!(
            "file name {name:?} uses reserved prefix {prefix:?}"
        )));
    }
    Ok(())
}

/// Validate `name` and join it onto `dir`
pub fn join(dir: &Path, name: &str) -> Result<PathBuf> {
    validate(name)?;
    Ok(dir.join(name))
}

/// Validate `name` as a new entry and join it onto `dir`
pub fn join_new(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_new(name)?;
    Ok(dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seglog_common::ErrorKind;

    #[test]
    fn test_accepts_segment_names() {
        assert!(validate("open-1").is_ok());
        assert!(validate("0000000000000001-0000000000000100").is_ok());
        assert!(validate(&"x".repeat(MAX_FILENAME_LEN)).is_ok());
    }

    #[test]
    fn test_rejects_bad_names() {
        for name in ["", ".", "..", "a/b", "nul\0byte"] {
            let err = validate(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{name:?}");
        }
        assert!(validate(&"x".repeat(MAX_FILENAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_reserved_prefixes() {
        for name in [".tmp-meta", ".probe-0123456789abcdef"] {
            assert!(validate(name).is_ok());
            let err = validate_new(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{name:?}");
        }
        assert!(validate_new(".hidden").is_ok());
        assert!(validate_new("tmp-meta").is_ok());
    }

    #[test]
    fn test_join() {
        let path = join(Path::new("/data/raft"), "metadata1").unwrap();
        assert_eq!(path, PathBuf::from("/data/raft/metadata1"));
    }
}

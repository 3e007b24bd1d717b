//! Segment and metadata file reads
//!
//! Besides plain reads this module implements the trailing-zero scan used
//! during recovery to find where written data ends inside a preallocated
//! segment.

use crate::names;
use seglog_common::{Error, ReadStatus, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Chunk size used when scanning for trailing zeros
const SCAN_CHUNK: usize = 64 * 1024;

/// Open an existing file read-only
pub fn open_file_for_reading(dir: &Path, name: &str) -> Result<File> {
    let path = names::join(dir, name)?;
    File::open(&path).map_err(|e| Error::io("open", &path, e))
}

/// Read exactly `buf.len()` bytes from the current position of `file`
///
/// Fails with a short-read error if end-of-file comes first.
pub fn read_into(file: &mut File, buf: &mut [u8]) -> Result<()> {
    let read = read_fully(file, buf).map_err(|e| Error::syscall("read", e))?;
    if read < buf.len() {
        return Err(Error::ShortRead {
            expected: buf.len(),
            read,
        });
    }
    Ok(())
}

/// Read the whole content of `name` in `dir`
pub fn read_file(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = names::join(dir, name)?;
    let mut file = File::open(&path).map_err(|e| Error::io("open", &path, e))?;

    let len = file.metadata().map_err(|e| Error::io("stat", &path, e))?.len();
    let len = usize::try_from(len).map_err(|_| {
        Error::invalid_argument(format!(
            "{} is too large to read ({len} bytes)",
            path.display()
        ))
    })?;

    let mut buf = vec![0u8; len];
    let read = read_fully(&mut file, &mut buf).map_err(|e| Error::io("read", &path, e))?;
    if read < len {
        return Err(Error::ShortRead {
            expected: len,
            read,
        });
    }
    Ok(buf)
}

/// Read the whole content of `name` in `dir` into `buf`
///
/// The file must hold exactly `buf.len()` bytes. An empty file yields
/// [`ReadStatus::NoData`]; a larger file is an error rather than a
/// truncated read.
pub fn read_file_into(dir: &Path, name: &str, buf: &mut [u8]) -> Result<ReadStatus> {
    let path = names::join(dir, name)?;
    let mut file = File::open(&path).map_err(|e| Error::io("open", &path, e))?;

    let read = read_fully(&mut file, buf).map_err(|e| Error::io("read", &path, e))?;
    if read < buf.len() {
        if read == 0 {
            return Ok(ReadStatus::NoData);
        }
        return Err(Error::ShortRead {
            expected: buf.len(),
            read,
        });
    }

    let mut extra = [0u8; 1];
    let more = read_fully(&mut file, &mut extra).map_err(|e| Error::io("read", &path, e))?;
    if more > 0 {
        return Err(Error::TooLarge {
            path,
            capacity: buf.len(),
        });
    }

    if read == 0 {
        return Ok(ReadStatus::NoData);
    }
    Ok(ReadStatus::Complete)
}

/// Whether every byte from the current position of `file` to its end is
/// zero
///
/// The position is restored before returning, so a caller can probe a
/// candidate end-of-data offset and keep parsing from it.
pub fn file_has_only_trailing_zeros(file: &mut File) -> Result<bool> {
    let offset = file.stream_position().map_err(|e| Error::syscall("lseek", e))?;
    let scanned = scan_zeros(file);
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| Error::syscall("lseek", e))?;
    scanned
}

fn scan_zeros(file: &mut File) -> Result<bool> {
    let mut chunk = vec![0u8; SCAN_CHUNK];
    loop {
        let n = match file.read(&mut chunk) {
            Ok(0) => return Ok(true),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::syscall("read", e)),
        };
        if chunk[..n].iter().any(|b| *b != 0) {
            return Ok(false);
        }
    }
}

/// Whether the current position of `file` is at or past end-of-file
///
/// Never fails: if the position or size cannot be determined the answer is
/// `false`, and the next read reports the underlying error.
pub fn is_at_eof(file: &mut File) -> bool {
    let Ok(offset) = file.stream_position() else {
        return false;
    };
    file.metadata().is_ok_and(|meta| offset >= meta.len())
}

/// Read until `buf` is full or end-of-file, returning the bytes read
fn read_fully(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

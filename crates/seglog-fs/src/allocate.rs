//! Segment file allocation
//!
//! New segment files are created exclusively and their full size is
//! reserved up front, so appends into the reserved region can never fail
//! for lack of space once the file has been handed out.

use crate::dir::sync_dir;
use crate::names;
use seglog_common::{AllocationMode, Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;
use tracing::{debug, warn};

/// Chunk size used when reserving space by writing zeros
const ZERO_FILL_CHUNK: usize = 64 * 1024;

/// Create `name` in `dir` and reserve `size` bytes for it
///
/// The returned descriptor is open for reading and writing, positioned at
/// offset 0. Fails if the file already exists.
pub fn allocate_file(dir: &Path, name: &str, size: u64) -> Result<File> {
    allocate_file_with(dir, name, size, AllocationMode::default())
}

/// [`allocate_file`] with an explicit reservation strategy
pub fn allocate_file_with(
    dir: &Path,
    name: &str,
    size: u64,
    mode: AllocationMode,
) -> Result<File> {
    let path = names::join_new(dir, name)?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| Error::io("create", &path, e))?;

    let reserved = reserve(&file, &path, size, mode)
        .and_then(|()| file.sync_all().map_err(|e| Error::io("fsync", &path, e)));
    if let Err(err) = reserved {
        drop(file);
        discard(&path);
        return Err(err);
    }

    sync_dir(dir)?;

    debug!("Allocated {} ({} bytes, {:?})", path.display(), size, mode);
    Ok(file)
}

/// Reserve `size` bytes of backing storage for `file`
pub(crate) fn reserve(file: &File, path: &Path, size: u64, mode: AllocationMode) -> Result<()> {
    if size == 0 {
        return Ok(());
    }

    match mode {
        AllocationMode::Fallocate => match fallocate(file, size) {
            Ok(()) => Ok(()),
            Err(e) if is_unsupported(&e) => {
                debug!(
                    "fallocate not supported for {}, writing zeros instead",
                    path.display()
                );
                zero_fill(file, path, size)
            }
            Err(e) => Err(reserve_error(path, size, e, "fallocate")),
        },
        AllocationMode::ZeroFill => zero_fill(file, path, size),
    }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn fallocate(file: &File, size: u64) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let len = libc::off_t::try_from(size)
        .map_err(|_| io::Error::from_raw_os_error(libc::EFBIG))?;
    // SAFETY: the descriptor is valid for the lifetime of `file`.
    let rv = unsafe { libc::posix_fallocate(file.as_raw_fd(), 0, len) };
    if rv == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rv))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn fallocate(_file: &File, _size: u64) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

fn is_unsupported(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::Unsupported
        || matches!(e.raw_os_error(), Some(libc::EOPNOTSUPP | libc::EINVAL))
}

/// Reserve space by writing zeros over the whole file
fn zero_fill(file: &File, path: &Path, size: u64) -> Result<()> {
    let zeros = vec![0u8; ZERO_FILL_CHUNK];
    let mut offset = 0u64;
    while offset < size {
        let n = usize::try_from(size - offset)
            .map_or(ZERO_FILL_CHUNK, |left| left.min(ZERO_FILL_CHUNK));
        file.write_all_at(&zeros[..n], offset)
            .map_err(|e| reserve_error(path, size, e, "write"))?;
        offset += n as u64;
    }
    Ok(())
}

fn reserve_error(path: &Path, size: u64, e: io::Error, op: &'static str) -> Error {
    if e.kind() == io::ErrorKind::StorageFull || e.raw_os_error() == Some(libc::ENOSPC) {
        Error::NoSpace {
            path: path.to_path_buf(),
            size,
        }
    } else {
        Error::io(op, path, e)
    }
}

/// Best-effort unlink of a file left behind by a failed operation
pub(crate) fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

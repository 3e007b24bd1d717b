//! Filesystem capability probing
//!
//! Whether direct I/O works, with which block size, and whether kernel
//! AIO writes are truly asynchronous depends on the filesystem instance
//! behind a directory, not just on the operating system. The probe finds
//! out by trial: it creates a throwaway file, attempts the I/O, and
//! removes the file again on every exit path.
//!
//! Probe steps on Linux:
//! ```text
//! create .probe-<random> -> fallocate -> open O_DIRECT -> aligned pwrite
//!   (4096, 2048, ... bytes until accepted) -> AIO write with RWF_NOWAIT
//! ```

use crate::allocate::reserve;
use crate::dir::sync_dir;
use seglog_common::{AllocationMode, CapabilityProfile, Error, ProbeConfig, Result};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix of the throwaway file created while probing
pub const PROBE_FILE_PREFIX: &str = ".probe-";

/// Probe `dir` with the default block size range
pub fn probe_capabilities(dir: &Path) -> Result<CapabilityProfile> {
    probe_capabilities_with(dir, &ProbeConfig::default())
}

/// Probe `dir`, trying direct I/O block sizes from `config`
///
/// A filesystem that lacks a capability is a successful probe with that
/// capability reported as absent; errors are reserved for failures that
/// prevent probing at all.
pub fn probe_capabilities_with(dir: &Path, config: &ProbeConfig) -> Result<CapabilityProfile> {
    config.validate()?;

    let profile = with_probe_file(dir, config.max_block_size, |path| {
        platform::probe(dir, path, config)
    })?;

    debug!(
        "Probed {}: direct_io_block_size={}, async_io_supported={}",
        dir.display(),
        profile.direct_io_block_size,
        profile.async_io_supported
    );
    Ok(profile)
}

/// Run `f` against a fresh probe file in `dir`
///
/// The file is gone when this returns, whether `f` succeeded or not.
fn with_probe_file<T>(dir: &Path, size: usize, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let probe = ProbeFile::create(dir, size)?;
    let value = f(probe.path())?;
    probe.remove()?;
    Ok(value)
}

/// Throwaway probe file, unlinked when dropped
struct ProbeFile {
    path: PathBuf,
    removed: bool,
}

impl ProbeFile {
    fn create(dir: &Path, size: usize) -> Result<Self> {
        let path = dir.join(format!("{PROBE_FILE_PREFIX}{:016x}", rand::random::<u64>()));

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| Error::probe(&path, format!("create probe file: {e}")))?;
        let probe = Self {
            path,
            removed: false,
        };

        reserve(&file, &probe.path, size as u64, AllocationMode::Fallocate)?;
        Ok(probe)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Unlink the file, reporting failure
    fn remove(mut self) -> Result<()> {
        self.removed = true;
        fs::remove_file(&self.path).map_err(|e| Error::io("unlink", &self.path, e))?;
        if let Some(dir) = self.path.parent() {
            sync_dir(dir)?;
        }
        Ok(())
    }
}

impl Drop for ProbeFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove probe file {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use crate::aio::AioContext;
    use crate::direct::{AlignedBuffer, open_direct};
    use seglog_common::{CapabilityProfile, Error, ProbeConfig, Result};
    use std::fs::File;
    use std::os::unix::fs::FileExt;
    use std::path::Path;
    use tracing::debug;

    pub(super) fn probe(
        dir: &Path,
        path: &Path,
        config: &ProbeConfig,
    ) -> Result<CapabilityProfile> {
        match nix::sys::statfs::statfs(dir) {
            Ok(stat) => debug!(
                "Probing {} (filesystem magic {:#x})",
                dir.display(),
                stat.filesystem_type().0
            ),
            Err(e) => debug!("Probing {} (statfs failed: {})", dir.display(), e),
        }

        let file = match open_direct(path) {
            Ok(file) => file,
            Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
                debug!("O_DIRECT rejected in {}", dir.display());
                return Ok(CapabilityProfile::BUFFERED);
            }
            Err(e) => return Err(Error::probe(path, format!("open with O_DIRECT: {e}"))),
        };

        let Some(buf) = probe_direct_block_size(&file, path, config)? else {
            debug!("No direct I/O block size accepted in {}", dir.display());
            return Ok(CapabilityProfile::BUFFERED);
        };

        let async_io_supported = config.check_async && probe_async(&file, path, &buf)?;

        Ok(CapabilityProfile {
            direct_io_block_size: buf.len(),
            async_io_supported,
        })
    }

    /// Find the largest block size accepted for an aligned direct write
    ///
    /// Returns the buffer that was written, sized to that block size.
    fn probe_direct_block_size(
        file: &File,
        path: &Path,
        config: &ProbeConfig,
    ) -> Result<Option<AlignedBuffer>> {
        for size in config.block_sizes() {
            let buf = AlignedBuffer::zeroed(size, size)?;
            match file.write_at(&buf, 0) {
                Ok(n) if n == size => return Ok(Some(buf)),
                Ok(n) => {
                    return Err(Error::probe(
                        path,
                        format!("short direct write: {n} bytes instead of {size}"),
                    ));
                }
                Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
                    debug!("Direct write of {} bytes rejected", size);
                }
                Err(e) => {
                    return Err(Error::probe(
                        path,
                        format!("direct write of {size} bytes: {e}"),
                    ));
                }
            }
        }
        Ok(None)
    }

    /// Check whether a kernel AIO write completes without blocking
    fn probe_async(file: &File, path: &Path, buf: &AlignedBuffer) -> Result<bool> {
        let ctx = match AioContext::setup(1) {
            Ok(ctx) => ctx,
            Err(e) if is_unsupported(e.raw_os_error()) => {
                debug!("io_setup unavailable: {}", e);
                return Ok(false);
            }
            Err(e) => return Err(Error::probe(path, format!("io_setup: {e}"))),
        };

        let res = match ctx.write_nowait(file, buf, 0) {
            Ok(res) => res,
            Err(e) if is_unsupported(e.raw_os_error()) => {
                debug!("io_submit with RWF_NOWAIT rejected: {}", e);
                return Ok(false);
            }
            Err(e) => return Err(Error::probe(path, format!("io_submit: {e}"))),
        };

        if res == buf.len() as i64 {
            return Ok(true);
        }
        if res < 0 {
            let errno = i32::try_from(-res).unwrap_or(libc::EIO);
            let err = std::io::Error::from_raw_os_error(errno);
            if is_unsupported(Some(errno)) {
                debug!("AIO write failed ({}), treating async I/O as unsupported", err);
                return Ok(false);
            }
            return Err(Error::probe(path, format!("AIO write: {err}")));
        }
        Err(Error::probe(
            path,
            format!("short AIO write: {res} bytes instead of {}", buf.len()),
        ))
    }

    fn is_unsupported(errno: Option<i32>) -> bool {
        matches!(
            errno,
            Some(libc::EAGAIN | libc::EOPNOTSUPP | libc::EINVAL | libc::ENOSYS | libc::EPERM)
        )
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use seglog_common::{CapabilityProfile, ProbeConfig, Result};
    use std::path::Path;

    /// Direct and native async I/O are only used on Linux
    pub(super) fn probe(
        _dir: &Path,
        _path: &Path,
        _config: &ProbeConfig,
    ) -> Result<CapabilityProfile> {
        Ok(CapabilityProfile::BUFFERED)
    }
}

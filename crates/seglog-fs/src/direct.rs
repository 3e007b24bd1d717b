//! Direct I/O helpers
//!
//! Direct (unbuffered) I/O bypasses the page cache and requires the
//! memory buffer, file offset and transfer size to be aligned to the
//! filesystem's logical block size:
//! - Linux: `O_DIRECT` flag
//! - elsewhere: not used by this crate

use seglog_common::{Error, Result};
use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

#[cfg(target_os = "linux")]
use std::fs::{File, OpenOptions};
#[cfg(target_os = "linux")]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(target_os = "linux")]
use std::path::Path;

/// Zero-initialised buffer whose address and length are multiples of a
/// block size, suitable for direct I/O transfers.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: the buffer exclusively owns its allocation.
unsafe impl Send for AlignedBuffer {}
// SAFETY: shared access only hands out `&[u8]`.
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocate at least `size` zeroed bytes aligned to `alignment`
    ///
    /// The length is rounded up to a multiple of `alignment` and is never
    /// smaller than one block.
    pub fn zeroed(size: usize, alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() {
            return Err(Error::invalid_argument(format!(
                "alignment {alignment} is not a power of two"
            )));
        }
        let len = size.max(1).div_ceil(alignment) * alignment;
        let layout = Layout::from_size_align(len, alignment).map_err(|e| {
            Error::invalid_argument(format!("invalid buffer layout ({len}/{alignment}): {e}"))
        })?;

        // SAFETY: the layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(layout)
        };

        Ok(Self { ptr, layout })
    }

    /// Buffer length in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.layout.size()
    }

    /// Always false; kept for API symmetry with slices
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Alignment of the start address
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Copy `src` to the start of the buffer, zeroing the remainder
    pub fn copy_from(&mut self, src: &[u8]) {
        let n = src.len().min(self.len());
        self[..n].copy_from_slice(&src[..n]);
        self[n..].fill(0);
    }
}

impl Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() initialised bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for layout.size() bytes and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `zeroed` with this exact layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len())
            .field("alignment", &self.alignment())
            .finish()
    }
}

/// Open an existing file for writing with the page cache bypassed
#[cfg(target_os = "linux")]
pub(crate) fn open_direct(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_DIRECT)
        .open(path)
}

//! Error types for seglog
//!
//! Every fallible segment file operation returns [`Result`]. The variants
//! carry the operation, path and byte counts involved so the rendered
//! message is a complete diagnostic, and [`Error::kind`] lets callers
//! branch on the failure class without inspecting strings.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Common result type for seglog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure class of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The target entry does not exist
    NotFound,
    /// The target entry exists where exclusive creation was required
    AlreadyExists,
    /// A system call failed
    Io,
    /// Storage could not be reserved
    NoSpace,
    /// Fewer bytes than requested were available
    ShortRead,
    /// Content does not fit the destination buffer
    TooLarge,
    /// The caller passed an unusable name or size
    InvalidArgument,
    /// Capability detection failed for a reason other than lack of support
    Probe,
}

/// Common error type for seglog
#[derive(Debug, Error)]
pub enum Error {
    #[error("{op} {}: file not found", path.display())]
    NotFound { op: &'static str, path: PathBuf },

    #[error("{op} {}: file already exists", path.display())]
    AlreadyExists { op: &'static str, path: PathBuf },

    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{op}: {source}")]
    Syscall {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("allocate {}: not enough space to reserve {size} bytes", path.display())]
    NoSpace { path: PathBuf, size: u64 },

    #[error("short read: {read} bytes instead of {expected}")]
    ShortRead { expected: usize, read: usize },

    #[error("read {}: file has more than {capacity} bytes", path.display())]
    TooLarge { path: PathBuf, capacity: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("probe {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("blocking task failed: {0}")]
    Offload(String),
}

impl Error {
    /// Wrap an I/O error raised by `op` on `path`
    ///
    /// `NotFound` and `AlreadyExists` OS errors are lifted into the
    /// corresponding existence variants.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { op, path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { op, path },
            _ => Self::Io { op, path, source },
        }
    }

    /// Wrap an I/O error raised by `op` on an already open descriptor
    pub fn syscall(op: &'static str, source: io::Error) -> Self {
        Self::Syscall { op, source }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a capability detection error
    pub fn probe(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Failure class of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Io { .. } | Self::Syscall { .. } | Self::Offload(_) => ErrorKind::Io,
            Self::NoSpace { .. } => ErrorKind::NoSpace,
            Self::ShortRead { .. } => ErrorKind::ShortRead,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Probe { .. } => ErrorKind::Probe,
        }
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an already exists error
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Underlying OS error code, if any
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } | Self::Syscall { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

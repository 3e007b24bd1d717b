//! Seglog FS - Crash-safe segment file I/O
//!
//! This crate implements the file layer underneath a disk-resident
//! consensus log:
//! - Directory creation and metadata durability
//! - Existence and emptiness checks used during recovery
//! - Direct I/O and native async I/O capability probing
//! - Preallocated segment files with real storage reservation
//! - Durable one-shot writes with atomic replace
//! - Exact, whole-file and bounded reads plus trailing-zero scanning
//! - Removal and truncate-then-rename finalization
//!
//! Every operation is a blocking call. Use [`blocking::run_blocking`] to
//! keep them off latency-sensitive async tasks.

#[cfg(not(unix))]
compile_error!("seglog-fs requires a Unix platform");

#[cfg(target_os = "linux")]
mod aio;
pub mod allocate;
pub mod blocking;
pub mod dir;
pub mod direct;
pub mod finalize;
pub mod inspect;
pub mod names;
pub mod probe;
pub mod read;
pub mod write;

#[cfg(test)]
mod tests;

// Re-exports
pub use allocate::{allocate_file, allocate_file_with};
pub use dir::{ensure_dir, sync_dir};
pub use direct::AlignedBuffer;
pub use finalize::{remove_file, truncate_and_rename_file};
pub use inspect::{file_exists, file_is_empty};
pub use names::{MAX_FILENAME_LEN, RESERVED_PREFIXES};
pub use probe::{PROBE_FILE_PREFIX, probe_capabilities, probe_capabilities_with};
pub use read::{
    file_has_only_trailing_zeros, is_at_eof, open_file_for_reading, read_file, read_file_into,
    read_into,
};
pub use write::{TMP_FILE_PREFIX, make_file, make_or_replace_file};

pub use seglog_common::{
    AllocationMode, BufferSet, CapabilityProfile, Error, ErrorKind, FsConfig, ProbeConfig,
    ReadStatus, Result,
};

//! Offloading blocking file operations from async tasks
//!
//! Every operation in this crate may stall on durability syscalls. Async
//! callers run them through [`run_blocking`] so the stall lands on tokio's
//! blocking pool instead of a runtime worker.

use seglog_common::{Error, Result};

/// Run a blocking file operation on the blocking thread pool
///
/// Awaiting the returned future only waits for the operation; dropping it
/// does not cancel the syscall in flight.
pub async fn run_blocking<F, T>(op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| Error::Offload(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BufferSet, ErrorKind, make_or_replace_file, read_file};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_blocking_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let write_dir = path.clone();
        run_blocking(move || {
            make_or_replace_file(&write_dir, "metadata1", &BufferSet::from(b"vote=3".to_vec()))
        })
        .await
        .unwrap();

        let content = run_blocking(move || read_file(&path, "metadata1"))
            .await
            .unwrap();
        assert_eq!(content, b"vote=3");
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let err = run_blocking(move || read_file(&path, "missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_run_blocking_panic_is_an_error() {
        let err = run_blocking(|| -> Result<()> { panic!("storage thread died") })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}

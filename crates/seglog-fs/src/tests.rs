//! Segment lifecycle scenarios
//!
//! These exercise the operations together the way a log store uses them
//! across allocation, appends, recovery scanning and finalization.

use crate::*;
use bytes::Bytes;
use rand::{Rng, RngCore};
use std::io::{Seek, SeekFrom, Write};
use std::os::unix::fs::FileExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::tempdir;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

#[test]
fn test_allocated_file_is_all_zeros() {
    let dir = tempdir().unwrap();

    for (i, size) in [1u64, 511, 4096, 100_000].into_iter().enumerate() {
        let name = format!("open-{i}");
        let mut file = allocate_file(dir.path(), &name, size).unwrap();

        assert_eq!(file.metadata().unwrap().len(), size);
        assert!(file_has_only_trailing_zeros(&mut file).unwrap());
        assert!(!file_is_empty(dir.path(), &name).unwrap());
    }
}

#[test]
fn test_trailing_zeros_locate_end_of_data() {
    let dir = tempdir().unwrap();
    let mut file = allocate_file(dir.path(), "open-1", 4096).unwrap();

    let record = [0x5au8; 100];
    file.write_all_at(&record, 0).unwrap();

    file.seek(SeekFrom::Start(100)).unwrap();
    assert!(file_has_only_trailing_zeros(&mut file).unwrap());

    let far = [0x7eu8; 50];
    file.write_all_at(&far, 4000).unwrap();

    file.seek(SeekFrom::Start(100)).unwrap();
    assert!(!file_has_only_trailing_zeros(&mut file).unwrap());
    assert_eq!(file.stream_position().unwrap(), 100);
}

#[test]
fn test_make_file_read_back() {
    let dir = tempdir().unwrap();
    let mut rng = rand::thread_rng();

    for i in 0..8 {
        let bufs: BufferSet = (0..rng.gen_range(1..6))
            .map(|_| Bytes::from(random_bytes(rng.gen_range(0..5000))))
            .collect();
        let name = format!("snapshot-{i}");

        make_file(dir.path(), &name, &bufs).unwrap();
        assert_eq!(read_file(dir.path(), &name).unwrap(), bufs.to_vec());
    }
}

#[test]
fn test_replace_is_never_observed_partially() {
    let dir = tempdir().unwrap();
    let first = BufferSet::from(vec![1u8; 256 * 1024]);
    let second = BufferSet::from(vec![2u8; 128 * 1024]);
    make_or_replace_file(dir.path(), "metadata1", &first).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let dir = dir.path().to_path_buf();
        let done = Arc::clone(&done);
        let (first, second) = (first.to_vec(), second.to_vec());
        std::thread::spawn(move || {
            let mut observations = 0;
            while !done.load(Ordering::Acquire) || observations == 0 {
                assert!(file_exists(&dir, "metadata1").unwrap());
                let content = read_file(&dir, "metadata1").unwrap();
                assert!(content == first || content == second);
                observations += 1;
            }
        })
    };

    for round in 0..20 {
        let bufs = if round % 2 == 0 { &second } else { &first };
        make_or_replace_file(dir.path(), "metadata1", bufs).unwrap();
    }
    make_or_replace_file(dir.path(), "metadata1", &second).unwrap();
    done.store(true, Ordering::Release);
    observer.join().unwrap();

    assert_eq!(read_file(dir.path(), "metadata1").unwrap(), second.to_vec());
}

#[test]
fn test_segment_lifecycle() {
    let dir = tempdir().unwrap();
    let seg_dir = dir.path().join("raft");
    ensure_dir(&seg_dir).unwrap();

    // Allocate and append two entries
    let mut file = allocate_file(&seg_dir, "open-1", 64 * 1024).unwrap();
    let entries = [random_bytes(700), random_bytes(1300)];
    for entry in &entries {
        file.write_all(entry).unwrap();
    }
    file.sync_data().unwrap();
    drop(file);

    // Recovery: walk the entries, then confirm the rest is filler
    let mut file = open_file_for_reading(&seg_dir, "open-1").unwrap();
    for entry in &entries {
        let mut buf = vec![0u8; entry.len()];
        read_into(&mut file, &mut buf).unwrap();
        assert_eq!(&buf, entry);
    }
    assert!(!is_at_eof(&mut file));
    assert!(file_has_only_trailing_zeros(&mut file).unwrap());
    let used = file.stream_position().unwrap();
    drop(file);

    // Close the segment out
    truncate_and_rename_file(&seg_dir, used, "open-1", "1-2").unwrap();
    assert!(!file_exists(&seg_dir, "open-1").unwrap());
    assert!(file_exists(&seg_dir, "1-2").unwrap());
    assert_eq!(read_file(&seg_dir, "1-2").unwrap(), entries.concat());

    let mut file = open_file_for_reading(&seg_dir, "1-2").unwrap();
    file.seek(SeekFrom::End(0)).unwrap();
    assert!(is_at_eof(&mut file));
    drop(file);

    // And eventually drop it
    remove_file(&seg_dir, "1-2").unwrap();
    assert!(!file_exists(&seg_dir, "1-2").unwrap());
}

#[test]
fn test_metadata_file_recovery() {
    let dir = tempdir().unwrap();
    let mut buf = [0u8; 16];

    // Missing and empty metadata are distinguishable
    assert!(read_file_into(dir.path(), "metadata1", &mut buf).unwrap_err().is_not_found());
    make_file(dir.path(), "metadata1", &BufferSet::new()).unwrap();
    assert_eq!(
        read_file_into(dir.path(), "metadata1", &mut buf).unwrap(),
        ReadStatus::NoData
    );

    let content = BufferSet::new()
        .with(1u64.to_le_bytes().to_vec())
        .with(42u64.to_le_bytes().to_vec());
    make_or_replace_file(dir.path(), "metadata1", &content).unwrap();
    assert_eq!(
        read_file_into(dir.path(), "metadata1", &mut buf).unwrap(),
        ReadStatus::Complete
    );
    assert_eq!(&buf[..], &content.to_vec()[..]);

    let mut small = [0u8; 8];
    let err = read_file_into(dir.path(), "metadata1", &mut small).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooLarge);
}

#[test]
fn test_invalid_names_touch_nothing() {
    let dir = tempdir().unwrap();

    let err = allocate_file(dir.path(), "../escape", 4096).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = make_file(dir.path(), "", &BufferSet::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

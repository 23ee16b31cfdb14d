//! Tests for the cache log reader

use std::fs;
use std::io::Write;

use msgsync::cache::{CacheReader, CacheWriter, LogRecord, FILE_HEADER_SIZE};
use msgsync::config::CacheSyncStrategy;
use msgsync::SyncError;
use tempfile::TempDir;

use super::create;

#[test]
fn test_reads_records_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.log");
    {
        let mut writer = CacheWriter::open(&path, CacheSyncStrategy::EveryWrite).unwrap();
        for id in ["a", "b", "c"] {
            writer.append(create(id)).unwrap();
        }
    }

    let mut reader = CacheReader::open(&path).unwrap();
    let mut ids = Vec::new();
    while let Some(record) = reader.next_record().unwrap() {
        match record {
            LogRecord::Mutation(entry) => ids.push(entry.mutation.id().to_string()),
            LogRecord::Commit { .. } => panic!("unexpected commit marker"),
        }
    }

    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(reader.position(), reader.file_len());
}

#[test]
fn test_empty_file_has_no_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.log");
    fs::File::create(&path).unwrap();

    let mut reader = CacheReader::open(&path).unwrap();
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn test_header_only_file_has_no_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.log");
    CacheWriter::open(&path, CacheSyncStrategy::EveryWrite).unwrap();

    let mut reader = CacheReader::open(&path).unwrap();
    assert_eq!(reader.position(), FILE_HEADER_SIZE as u64);
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn test_bad_magic_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.log");
    fs::write(&path, b"NOPE\x01\x00").unwrap();

    assert!(matches!(
        CacheReader::open(&path),
        Err(SyncError::CacheCorruption(_))
    ));
}

#[test]
fn test_unknown_version_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.log");
    fs::write(&path, b"MSGC\x09\x00").unwrap();

    assert!(matches!(
        CacheReader::open(&path),
        Err(SyncError::CacheCorruption(_))
    ));
}

#[test]
fn test_iterator_stops_at_truncated_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.log");
    {
        let mut writer = CacheWriter::open(&path, CacheSyncStrategy::EveryWrite).unwrap();
        writer.append(create("a")).unwrap();
    }
    let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
    file.write_all(&[0u8; 10]).unwrap();

    let results: Vec<_> = CacheReader::open(&path).unwrap().records().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(SyncError::CacheCorruption(_))));
}

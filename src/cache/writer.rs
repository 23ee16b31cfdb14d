//! Cache log writer
//!
//! Appends framed records to the cache log. Each record goes to the file in a
//! single write followed by a flush; a failed write is rolled back to the
//! previous record boundary so the log never keeps a half-written entry.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::CacheSyncStrategy;
use crate::error::{Result, SyncError};

use super::entry::{file_header, FILE_HEADER_SIZE};
use super::reader::{CacheReader, ReadOutcome};
use super::{CacheEntry, LogRecord, Mutation};

/// Writes records to the cache log file
pub struct CacheWriter {
    path: PathBuf,
    file: File,

    /// Current length of the file (always a record boundary)
    file_len: u64,

    /// Sequence number the next mutation will receive
    next_seq: u64,

    sync_strategy: CacheSyncStrategy,

    /// Appends not yet fsynced
    uncommitted: usize,
}

impl CacheWriter {
    /// Open or create a cache log
    ///
    /// An existing log must be clean (run `CacheRecovery::recover` first); the
    /// next sequence number continues after the highest one on disk.
    pub fn open(path: &Path, sync_strategy: CacheSyncStrategy) -> Result<Self> {
        let existing_len = fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let mut next_seq = 1;
        if existing_len > 0 {
            let mut reader = CacheReader::open(path)?;
            loop {
                match reader.read_next()? {
                    ReadOutcome::Record(record) => next_seq = next_seq.max(record.seq() + 1),
                    ReadOutcome::End => break,
                    ReadOutcome::Torn | ReadOutcome::Corrupt(_) => {
                        return Err(SyncError::CacheCorruption(format!(
                            "{} has a damaged tail at offset {}; recover it before writing",
                            path.display(),
                            reader.position()
                        )));
                    }
                }
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut file_len = existing_len;
        if file_len == 0 {
            file.write_all(&file_header())?;
            file.sync_all()?;
            file_len = FILE_HEADER_SIZE as u64;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            file_len,
            next_seq,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Append a mutation, assigning it the next sequence number
    pub fn append(&mut self, mutation: Mutation) -> Result<CacheEntry> {
        let entry = CacheEntry::new(self.next_seq, mutation);
        let boundary = self.file_len;
        self.write_record(&LogRecord::Mutation(entry.clone()))?;

        self.uncommitted += 1;
        let should_sync = match self.sync_strategy {
            CacheSyncStrategy::EveryWrite => true,
            CacheSyncStrategy::EveryNEntries { count } => self.uncommitted >= count,
        };
        if should_sync {
            if let Err(e) = self.sync() {
                // The caller will report the mutation as rejected, so it must
                // not survive in the log either
                self.uncommitted -= 1;
                self.truncate_to(boundary);
                return Err(e);
            }
        }

        self.next_seq += 1;
        Ok(entry)
    }

    /// Append a commit marker and fsync it
    pub fn append_commit(&mut self, through_seq: u64) -> Result<()> {
        self.write_record(&LogRecord::Commit { through_seq })?;
        self.sync()
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync_data()
            .map_err(|e| SyncError::CachePersistence(format!("fsync failed: {}", e)))?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Replace the whole log with `entries` (write-then-rename)
    ///
    /// A commit marker for `next_seq - 1` leads the new file so sequence
    /// numbers keep increasing after a restart.
    pub fn rewrite(&mut self, entries: &[CacheEntry]) -> Result<()> {
        let tmp_path = self.path.with_extension("compact");

        let mut bytes = file_header().to_vec();
        if self.next_seq > 1 {
            bytes.extend(
                LogRecord::Commit {
                    through_seq: self.next_seq - 1,
                }
                .serialize()?,
            );
        }
        for entry in entries {
            bytes.extend(LogRecord::Mutation(entry.clone()).serialize()?);
        }

        // The compacted file's own handle becomes the live log
        match fs::remove_file(&tmp_path) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let mut tmp = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&tmp_path)?;
        if let Err(e) = tmp.write_all(&bytes).and_then(|_| tmp.sync_all()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        sync_parent_dir(&self.path);

        self.file = tmp;
        self.file_len = bytes.len() as u64;
        self.uncommitted = 0;
        Ok(())
    }

    /// Get the sequence number the next append will use
    pub fn current_seq(&self) -> u64 {
        self.next_seq
    }

    /// Number of appends since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        let bytes = record.serialize()?;

        let written = self
            .file
            .write_all(&bytes)
            .and_then(|_| self.file.flush());

        if let Err(e) = written {
            // Drop whatever part of the record reached the file
            self.truncate_to(self.file_len);
            return Err(SyncError::CachePersistence(format!(
                "append to {} failed: {}",
                self.path.display(),
                e
            )));
        }

        self.file_len += bytes.len() as u64;
        Ok(())
    }

    fn truncate_to(&mut self, len: u64) {
        if let Err(e) = self.file.set_len(len) {
            tracing::error!(
                "Failed to roll back partial cache write in {}: {}",
                self.path.display(),
                e
            );
        }
        self.file_len = len;
    }
}

/// Make a rename durable; not every platform can open a directory
fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

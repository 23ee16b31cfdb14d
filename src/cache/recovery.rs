//! Cache recovery
//!
//! Rebuilds the pending mutation queue from the cache log after a restart.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::{CacheReader, ReadOutcome};
use super::{CacheEntry, LogRecord};

/// Handles cache recovery after a crash or restart
pub struct CacheRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of pending (uncommitted) mutations recovered
    pub entries_recovered: u64,

    /// Number of mutations dropped because a commit marker covered them
    pub entries_committed: u64,

    /// Number of corrupted records found (replay stops at the first one)
    pub entries_corrupted: u64,

    /// Highest sequence number seen in a valid record
    pub last_seq: u64,

    /// Whether bytes past the last valid record were found (and, for
    /// `recover`, removed)
    pub was_truncated: bool,
}

impl CacheRecovery {
    /// Recover pending entries from a cache log
    ///
    /// This will:
    /// 1. Read records in order up to the first partial or corrupted one
    /// 2. Truncate the file to the last valid record
    /// 3. Drop mutations covered by commit markers
    /// 4. Return the remaining mutations in order
    ///
    /// A missing file recovers as empty.
    pub fn recover(path: &Path) -> Result<(Vec<CacheEntry>, RecoveryResult)> {
        if !path.exists() {
            return Ok((Vec::new(), RecoveryResult::default()));
        }

        let (entries, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            tracing::warn!(
                "Truncating cache log {} to {} bytes ({} corrupted records)",
                path.display(),
                valid_len,
                result.entries_corrupted
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a cache log without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        if !path.exists() {
            return Ok(RecoveryResult::default());
        }
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<CacheEntry>, RecoveryResult, u64)> {
        let mut reader = CacheReader::open(path)?;
        let mut result = RecoveryResult::default();
        let mut pending: VecDeque<CacheEntry> = VecDeque::new();

        loop {
            match reader.read_next()? {
                ReadOutcome::Record(record) => {
                    result.last_seq = result.last_seq.max(record.seq());
                    match record {
                        LogRecord::Mutation(entry) => pending.push_back(entry),
                        LogRecord::Commit { through_seq } => {
                            while pending.front().is_some_and(|e| e.seq <= through_seq) {
                                pending.pop_front();
                                result.entries_committed += 1;
                            }
                        }
                    }
                }
                ReadOutcome::End => break,
                ReadOutcome::Torn => {
                    result.was_truncated = true;
                    break;
                }
                ReadOutcome::Corrupt(reason) => {
                    tracing::warn!("Corrupted cache record in {}: {}", path.display(), reason);
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
            }
        }

        result.entries_recovered = pending.len() as u64;
        Ok((pending.into(), result, reader.position()))
    }
}

//! Mutation cache
//!
//! Durable FIFO of accepted mutations waiting to be reconciled.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::CacheSyncStrategy;
use crate::error::{Result, SyncError};

use super::{CacheEntry, CacheRecovery, CacheWriter, Mutation, RecoveryResult};

/// Ordered, crash-recoverable queue of pending mutations
///
/// ## Concurrency
/// - One mutex guards the log writer and the in-memory queue, so appends are
///   totally ordered and a `peek_batch` is a consistent snapshot of the head.
/// - Appends that land after a `peek_batch` are never part of that batch.
/// - `commit` is meant for a single reconciler; the engine serializes passes.
pub struct MutationCache {
    path: PathBuf,
    state: Mutex<CacheState>,
}

struct CacheState {
    writer: CacheWriter,
    pending: VecDeque<CacheEntry>,
}

impl MutationCache {
    /// Open a cache log, recovering any pending mutations
    ///
    /// The log is compacted on open so it only holds the pending entries.
    pub fn open(path: &Path, sync_strategy: CacheSyncStrategy) -> Result<Self> {
        let (entries, recovery) = CacheRecovery::recover(path)?;
        log_recovery(path, &recovery);

        let mut writer = CacheWriter::open(path, sync_strategy)?;
        writer.rewrite(&entries)?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(CacheState {
                writer,
                pending: entries.into(),
            }),
        })
    }

    /// Append a mutation to the tail
    ///
    /// Returns the sequence number assigned to it. On error the mutation is
    /// not cached and must not be reported as accepted.
    pub fn enqueue(&self, mutation: Mutation) -> Result<u64> {
        let mut state = self.state.lock();
        let entry = state.writer.append(mutation).map_err(|e| match e {
            e @ SyncError::CachePersistence(_) => e,
            other => SyncError::CachePersistence(other.to_string()),
        })?;
        let seq = entry.seq;
        state.pending.push_back(entry);
        Ok(seq)
    }

    /// Copy up to `limit` entries from the head, in order
    pub fn peek_batch(&self, limit: usize) -> Vec<CacheEntry> {
        self.state
            .lock()
            .pending
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Remove the first `count` entries
    ///
    /// A commit marker is made durable before the entries leave memory. Once
    /// the queue drains completely the log is compacted.
    pub fn commit(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let mut state = self.state.lock();
        if count > state.pending.len() {
            return Err(SyncError::CachePersistence(format!(
                "cannot commit {} mutations, only {} pending",
                count,
                state.pending.len()
            )));
        }

        let through_seq = state.pending[count - 1].seq;
        state.writer.append_commit(through_seq)?;
        state.pending.drain(..count);

        if state.pending.is_empty() {
            // The marker already made the commit durable
            if let Err(e) = state.writer.rewrite(&[]) {
                tracing::warn!("Cache compaction of {} failed: {}", self.path.display(), e);
            }
        }

        Ok(())
    }

    /// All pending entries, in order
    pub fn pending(&self) -> Vec<CacheEntry> {
        self.state.lock().pending.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    /// Sequence number the next enqueue will receive
    pub fn next_seq(&self) -> u64 {
        self.state.lock().writer.current_seq()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn log_recovery(path: &Path, recovery: &RecoveryResult) {
    if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 || recovery.was_truncated {
        tracing::info!(
            "Cache recovery from {}: {} pending, {} already committed, {} corrupted, last_seq={}",
            path.display(),
            recovery.entries_recovered,
            recovery.entries_committed,
            recovery.entries_corrupted,
            recovery.last_seq
        );
    }
}

//! Reconciler
//!
//! Drains the mutation cache into the durable sink, one bounded batch per pass.
//!
//! ## One pass
//! 1. Snapshot up to `batch_capacity` entries from the cache head
//! 2. Load the sink rows into an id-ordered projection
//! 3. Apply the batch to the projection in order
//! 4. Replace the sink contents with the projection
//! 5. Commit the batch, only after step 4 succeeded
//!
//! A failed sink write commits nothing; the next pass retries the same head.
//! Replaying a batch that already reached the sink is harmless: creates
//! upsert, updates set every field, deletes of missing rows do nothing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, Mutation, MutationCache};
use crate::error::{Result, SyncError};
use crate::sink::{SinkRow, TabularSink};
use crate::store::Record;

/// Outcome of one sync pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Mutations applied and committed in this pass
    pub applied: usize,

    /// Mutations still cached after the pass
    pub remaining: usize,

    /// Rows in the sink after the pass (0 when nothing was written)
    pub rows_written: usize,
}

impl SyncReport {
    /// True when the pass found nothing to do
    pub fn is_idle(&self) -> bool {
        self.applied == 0
    }
}

/// Applies cached mutations to the sink in capacity-bounded batches
pub struct Reconciler {
    cache: Arc<MutationCache>,
    sink: Arc<dyn TabularSink>,
    batch_capacity: usize,

    /// Serializes passes
    pass_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        cache: Arc<MutationCache>,
        sink: Arc<dyn TabularSink>,
        batch_capacity: usize,
    ) -> Self {
        Self {
            cache,
            sink,
            batch_capacity,
            pass_lock: Mutex::new(()),
        }
    }

    /// Run one reconciliation pass
    ///
    /// Returns immediately without touching the sink when the cache is empty.
    pub fn sync(&self) -> Result<SyncReport> {
        let _pass = self.pass_lock.lock().map_err(|e| {
            SyncError::LockPoisoned(format!("Reconciler lock poisoned: {}", e))
        })?;

        let batch = self.cache.peek_batch(self.batch_capacity);
        if batch.is_empty() {
            return Ok(SyncReport::default());
        }

        let mut projection: BTreeMap<String, Record> = self
            .sink
            .load()?
            .into_iter()
            .map(|row| (row.id.clone(), row.into_record()))
            .collect();

        for entry in &batch {
            apply_entry(&mut projection, entry);
        }

        let rows: Vec<SinkRow> = projection.values().map(SinkRow::from).collect();
        if let Err(e) = self.sink.replace(&rows) {
            tracing::warn!(
                "Sink write failed, keeping {} mutations cached for the next pass: {}",
                batch.len(),
                e
            );
            return Err(match e {
                e @ SyncError::SinkWrite(_) => e,
                other => SyncError::SinkWrite(other.to_string()),
            });
        }

        self.cache.commit(batch.len())?;

        let report = SyncReport {
            applied: batch.len(),
            remaining: self.cache.len(),
            rows_written: rows.len(),
        };
        tracing::info!(
            "Sync pass applied {} mutations (seq {}..={}), {} remaining, {} rows",
            report.applied,
            batch[0].seq,
            batch[batch.len() - 1].seq,
            report.remaining,
            report.rows_written
        );
        Ok(report)
    }

    /// Run passes until the cache is empty or a pass fails
    ///
    /// Mutations enqueued while draining are drained too.
    pub fn sync_all(&self) -> Result<SyncReport> {
        let mut total = SyncReport::default();
        loop {
            let report = self.sync()?;
            if report.is_idle() {
                return Ok(total);
            }
            total.applied += report.applied;
            total.remaining = report.remaining;
            total.rows_written = report.rows_written;
        }
    }

    pub fn batch_capacity(&self) -> usize {
        self.batch_capacity
    }
}

/// Apply one cached mutation to the row projection
fn apply_entry(projection: &mut BTreeMap<String, Record>, entry: &CacheEntry) {
    match &entry.mutation {
        Mutation::Create(record) => {
            projection.insert(record.id.clone(), record.clone());
        }
        Mutation::Update { id, patch } => match projection.get_mut(id) {
            Some(record) => record.apply_patch(patch),
            None => tracing::warn!(
                "Skipping update seq {} for {}: no row in the sink",
                entry.seq,
                id
            ),
        },
        Mutation::Delete { id } => {
            projection.remove(id);
        }
    }
}

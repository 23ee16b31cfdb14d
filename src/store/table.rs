//! Record Store implementation
//!
//! BTreeMap-based table with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::cache::Mutation;

use super::{Record, RecordPatch};

/// In-memory table of current records
///
/// Existence checks and mutations are separate calls; callers that need
/// check-then-act atomicity for an id hold that id's lock in the validator.
pub struct RecordStore {
    data: RwLock<BTreeMap<String, Record>>,
}

impl RecordStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get a copy of a record by id (read lock)
    pub fn get(&self, id: &str) -> Option<Record> {
        self.data.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.read().contains_key(id)
    }

    /// Insert or replace a record (write lock)
    ///
    /// Returns the record previously stored under the same id.
    pub fn insert(&self, record: Record) -> Option<Record> {
        self.data.write().insert(record.id.clone(), record)
    }

    /// Merge a patch onto an existing record
    ///
    /// Returns false if the id is absent.
    pub fn update(&self, id: &str, patch: &RecordPatch) -> bool {
        match self.data.write().get_mut(id) {
            Some(record) => {
                record.apply_patch(patch);
                true
            }
            None => false,
        }
    }

    /// Remove a record (write lock)
    pub fn remove(&self, id: &str) -> Option<Record> {
        self.data.write().remove(id)
    }

    /// Apply a mutation without validation (used during replay)
    pub fn apply(&self, mutation: &Mutation) {
        match mutation {
            Mutation::Create(record) => {
                self.insert(record.clone());
            }
            Mutation::Update { id, patch } => {
                if !self.update(id, patch) {
                    tracing::warn!("Replayed update for missing record {}", id);
                }
            }
            Mutation::Delete { id } => {
                self.remove(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// All records in id order
    pub fn snapshot(&self) -> Vec<Record> {
        self.data.read().values().cloned().collect()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

//! Mutation Validator
//!
//! Checks create/update/delete requests against the record store, caches the
//! accepted ones and applies them.
//!
//! ## Ordering
//! For one id, check → enqueue → apply runs under that id's lock, so the cache
//! holds mutations of an id in exactly the order the store applied them.
//! Different ids only contend when they hash to the same shard.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cache::{Mutation, MutationCache};
use crate::error::{Result, SyncError};
use crate::store::{Record, RecordPatch, RecordStore};

/// Number of lock shards for per-id serialization
const ID_LOCK_SHARDS: usize = 64;

/// Validates mutations and routes accepted ones to the cache and store
pub struct Validator {
    store: Arc<RecordStore>,
    cache: Arc<MutationCache>,
    id_locks: Vec<Mutex<()>>,
}

impl Validator {
    pub fn new(store: Arc<RecordStore>, cache: Arc<MutationCache>) -> Self {
        Self {
            store,
            cache,
            id_locks: (0..ID_LOCK_SHARDS).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Insert a new record
    ///
    /// Fails with `Conflict` if the id already exists. Returns the cache
    /// sequence number of the accepted mutation.
    pub fn create(&self, mut record: Record) -> Result<u64> {
        let _guard = self.lock_id(&record.id)?;
        record.normalize_image();

        if self.store.contains(&record.id) {
            return Err(SyncError::Conflict(record.id));
        }
        record.validate()?;

        let seq = self.cache.enqueue(Mutation::Create(record.clone()))?;
        self.store.insert(record);
        Ok(seq)
    }

    /// Merge a patch onto an existing record
    ///
    /// Fails with `NotFound` if the id is absent.
    pub fn update(&self, id: &str, patch: RecordPatch) -> Result<u64> {
        let _guard = self.lock_id(id)?;

        if !self.store.contains(id) {
            return Err(SyncError::NotFound(id.to_string()));
        }
        patch.validate()?;

        let seq = self.cache.enqueue(Mutation::Update {
            id: id.to_string(),
            patch: patch.clone(),
        })?;
        self.store.update(id, &patch);
        Ok(seq)
    }

    /// Remove an existing record
    ///
    /// Fails with `NotFound` if the id is absent.
    pub fn delete(&self, id: &str) -> Result<u64> {
        let _guard = self.lock_id(id)?;

        if !self.store.contains(id) {
            return Err(SyncError::NotFound(id.to_string()));
        }

        let seq = self.cache.enqueue(Mutation::Delete { id: id.to_string() })?;
        self.store.remove(id);
        Ok(seq)
    }

    fn lock_id(&self, id: &str) -> Result<MutexGuard<'_, ()>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        let shard = (hasher.finish() as usize) % self.id_locks.len();

        self.id_locks[shard].lock().map_err(|e| {
            SyncError::LockPoisoned(format!("Id lock poisoned: {}", e))
        })
    }
}

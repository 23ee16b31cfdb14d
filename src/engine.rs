//! Engine Module
//!
//! Wires the record store, validator, mutation cache, reconciler and sink
//! together.
//!
//! ## Responsibilities
//! - Open/recover every component from one `Config`
//! - Rebuild the record store after a restart
//! - Route client commands

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::MutationCache;
use crate::config::Config;
use crate::error::Result;
use crate::protocol::{Command, Response};
use crate::reconciler::{Reconciler, SyncReport};
use crate::sink::{CsvSink, TabularSink};
use crate::store::{Record, RecordPatch, RecordStore};
use crate::validator::Validator;

/// The message store engine
///
/// ## Concurrency Model
///
/// - **Mutations** (create/update/delete): serialized per id by the
///   validator; the cache mutex orders appends across ids.
/// - **Reads** (get/list): RecordStore read lock only.
/// - **Sync passes**: serialized by the reconciler; they may run while
///   mutations are being accepted, and only see entries cached before the
///   pass took its batch.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the cache log
    cache_path: PathBuf,

    /// Current records (authoritative)
    store: Arc<RecordStore>,

    /// Pending mutations (durable)
    cache: Arc<MutationCache>,

    validator: Validator,
    reconciler: Reconciler,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const CACHE_FILENAME: &'static str = "cache.log";

    /// Open or create an engine writing to a CSV sink under `data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let sink = Arc::new(CsvSink::new(config.sink_path()));
        Self::with_sink(config, sink)
    }

    /// Open or create an engine with a caller-supplied sink
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Recover pending mutations from the cache log
    /// 3. Rebuild the record store: sink rows, then pending mutations in order
    pub fn with_sink(config: Config, sink: Arc<dyn TabularSink>) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Recover the cache
        let cache_path = config.data_dir.join(Self::CACHE_FILENAME);
        let cache = Arc::new(MutationCache::open(&cache_path, config.cache_sync_strategy)?);

        // Step 3: Rebuild the store from what is already reconciled plus
        // what is still pending
        let store = Arc::new(RecordStore::new());
        for row in sink.load()? {
            store.insert(row.into_record());
        }
        let pending = cache.pending();
        for entry in &pending {
            store.apply(&entry.mutation);
        }
        tracing::info!(
            "Engine opened: {} records, {} pending mutations",
            store.len(),
            pending.len()
        );

        let validator = Validator::new(Arc::clone(&store), Arc::clone(&cache));
        let reconciler = Reconciler::new(Arc::clone(&cache), sink, config.batch_capacity);

        Ok(Self {
            config,
            cache_path,
            store,
            cache,
            validator,
            reconciler,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.data_dir = path.to_path_buf();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Response> {
        match command {
            Command::Create { record } => {
                self.create(record)?;
                Ok(Response::created())
            }
            Command::Update { id, patch } => {
                self.update(&id, patch)?;
                Ok(Response::no_content())
            }
            Command::Delete { id } => {
                self.delete(&id)?;
                Ok(Response::no_content())
            }
            Command::Get { id } => match self.get(&id) {
                Some(record) => Ok(Response::ok(Some(bincode::serialize(&record)?))),
                None => Ok(Response::not_found()),
            },
            Command::Sync => {
                let report = self.sync()?;
                Ok(Response::ok(Some(bincode::serialize(&report)?)))
            }
            Command::Ping => Ok(Response::ok(Some(b"PONG".to_vec()))),
        }
    }

    /// Create a record (`Conflict` if the id exists)
    pub fn create(&self, record: Record) -> Result<()> {
        self.validator.create(record).map(|_| ())
    }

    /// Update a record (`NotFound` if the id is absent)
    pub fn update(&self, id: &str, patch: RecordPatch) -> Result<()> {
        self.validator.update(id, patch).map(|_| ())
    }

    /// Delete a record (`NotFound` if the id is absent)
    pub fn delete(&self, id: &str) -> Result<()> {
        self.validator.delete(id).map(|_| ())
    }

    /// Get the current record for an id
    pub fn get(&self, id: &str) -> Option<Record> {
        self.store.get(id)
    }

    /// All current records in id order
    pub fn list(&self) -> Vec<Record> {
        self.store.snapshot()
    }

    /// Run one reconciliation pass
    pub fn sync(&self) -> Result<SyncReport> {
        self.reconciler.sync()
    }

    /// Run passes until nothing is pending
    pub fn sync_all(&self) -> Result<SyncReport> {
        self.reconciler.sync_all()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of mutations waiting for reconciliation
    pub fn pending(&self) -> usize {
        self.cache.len()
    }

    /// Number of current records
    pub fn record_count(&self) -> usize {
        self.store.len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the cache log path
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

//! Configuration for msgsync
//!
//! Centralized configuration with sensible defaults. Everything the engine
//! needs is passed in explicitly; the library never reads the environment.

use std::path::PathBuf;

use crate::error::{Result, SyncError};

/// Main configuration for a msgsync instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── cache.log        (pending mutation log)
    ///     └── {sink_file}      (reconciled rows, CSV)
    pub data_dir: PathBuf,

    /// File name of the durable sink inside `data_dir`
    pub sink_file: String,

    // -------------------------------------------------------------------------
    // Mutation Cache Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the cache log
    pub cache_sync_strategy: CacheSyncStrategy,

    // -------------------------------------------------------------------------
    // Reconciliation Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of mutations one sync pass may commit
    pub batch_capacity: usize,

    /// Interval between scheduled sync passes (milliseconds)
    pub sync_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max client connections waiting for a worker
    pub max_connections: usize,

    /// Number of connection worker threads
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Cache log sync strategy
///
/// Every append is flushed to the OS; this only controls fsync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSyncStrategy {
    /// fsync after every write (an accepted mutation survives power loss)
    EveryWrite,

    /// fsync after N unsynced entries
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./msgsync_data"),
            sink_file: "results.csv".to_string(),
            cache_sync_strategy: CacheSyncStrategy::EveryWrite,
            batch_capacity: 1000,
            sync_interval_ms: 5000,
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 1024,
            worker_threads: 8,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the durable sink file
    pub fn sink_path(&self) -> PathBuf {
        self.data_dir.join(&self.sink_file)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.batch_capacity == 0 {
            return Err(SyncError::Config(
                "batch_capacity must be at least 1".to_string(),
            ));
        }
        if self.sink_file.is_empty() {
            return Err(SyncError::Config("sink_file must not be empty".to_string()));
        }
        if let CacheSyncStrategy::EveryNEntries { count: 0 } = self.cache_sync_strategy {
            return Err(SyncError::Config(
                "cache sync count must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(SyncError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the sink file name
    pub fn sink_file(mut self, name: impl Into<String>) -> Self {
        self.config.sink_file = name.into();
        self
    }

    /// Set the cache sync strategy
    pub fn cache_sync_strategy(mut self, strategy: CacheSyncStrategy) -> Self {
        self.config.cache_sync_strategy = strategy;
        self
    }

    /// Set the per-pass batch capacity
    pub fn batch_capacity(mut self, capacity: usize) -> Self {
        self.config.batch_capacity = capacity;
        self
    }

    /// Set the scheduled sync interval (in milliseconds)
    pub fn sync_interval_ms(mut self, ms: u64) -> Self {
        self.config.sync_interval_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of queued connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

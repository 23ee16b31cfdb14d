//! Error types for msgsync
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Unified error type for msgsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Validation Errors (returned to the CRUD caller)
    // -------------------------------------------------------------------------
    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // -------------------------------------------------------------------------
    // Mutation Cache Errors
    // -------------------------------------------------------------------------
    #[error("Cache corruption detected: {0}")]
    CacheCorruption(String),

    #[error("Cache persistence failed: {0}")]
    CachePersistence(String),

    // -------------------------------------------------------------------------
    // Sink Errors
    // -------------------------------------------------------------------------
    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl SyncError {
    /// Protocol status reported to a client for this error
    pub fn status(&self) -> Status {
        match self {
            SyncError::Conflict(_) => Status::Conflict,
            SyncError::NotFound(_) => Status::NotFound,
            SyncError::InvalidRecord(_) | SyncError::Protocol(_) => Status::BadRequest,
            _ => Status::Error,
        }
    }
}

impl From<bincode::Error> for SyncError {
    fn from(e: bincode::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

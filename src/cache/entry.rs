//! Cache log record definitions
//!
//! Defines the mutations that flow through the cache and their on-disk framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::store::{Record, RecordPatch};

/// Magic bytes at the start of every cache log
pub const MAGIC: &[u8; 4] = b"MSGC";

/// Cache log format version
pub const VERSION: u16 = 1;

/// File header size: magic (4) + version (2)
pub const FILE_HEADER_SIZE: usize = 6;

/// Record header size: seq (8) + crc (4) + len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single record payload (16 MB)
pub const MAX_RECORD_SIZE: u32 = 16 * 1024 * 1024;

/// A change accepted by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert a new record
    Create(Record),

    /// Merge a patch onto an existing record
    Update { id: String, patch: RecordPatch },

    /// Remove a record
    Delete { id: String },
}

impl Mutation {
    /// Id of the record this mutation targets
    pub fn id(&self) -> &str {
        match self {
            Mutation::Create(record) => &record.id,
            Mutation::Update { id, .. } => id,
            Mutation::Delete { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// A pending mutation with its position in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Sequence number - monotonically increasing, never reused
    pub seq: u64,

    /// The mutation to apply
    pub mutation: Mutation,

    /// Timestamp (unix millis) when the entry was enqueued
    pub timestamp: u64,
}

impl CacheEntry {
    pub fn new(seq: u64, mutation: Mutation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            seq,
            mutation,
            timestamp,
        }
    }
}

/// One framed record in the cache log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    /// An enqueued mutation
    Mutation(CacheEntry),

    /// Every mutation with `seq <= through_seq` has been reconciled
    Commit { through_seq: u64 },
}

impl LogRecord {
    /// Sequence number stored in the record header
    pub fn seq(&self) -> u64 {
        match self {
            LogRecord::Mutation(entry) => entry.seq,
            LogRecord::Commit { through_seq } => *through_seq,
        }
    }

    /// Serialize to framed bytes: seq (8) + crc (4) + len (4) + data
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        if data.len() > MAX_RECORD_SIZE as usize {
            return Err(SyncError::CachePersistence(format!(
                "Record too large: {} bytes (max {})",
                data.len(),
                MAX_RECORD_SIZE
            )));
        }

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.seq().to_le_bytes());
        bytes.extend_from_slice(&Self::compute_crc(&data).to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Deserialize one framed record, verifying length, checksum and seq
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let (seq, crc, len) = Self::parse_header(bytes)?;

        let total = HEADER_SIZE + len as usize;
        if bytes.len() < total {
            return Err(SyncError::CacheCorruption(format!(
                "Incomplete record: expected {} bytes, got {}",
                total,
                bytes.len()
            )));
        }

        Self::decode_payload(seq, crc, &bytes[HEADER_SIZE..total])
    }

    /// Split a record header into (seq, crc, len)
    pub(crate) fn parse_header(bytes: &[u8]) -> Result<(u64, u32, u32)> {
        if bytes.len() < HEADER_SIZE {
            return Err(SyncError::CacheCorruption(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let seq = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]);
        let crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        if len > MAX_RECORD_SIZE {
            return Err(SyncError::CacheCorruption(format!(
                "Record length {} exceeds maximum {}",
                len, MAX_RECORD_SIZE
            )));
        }

        Ok((seq, crc, len))
    }

    /// Verify and decode a record payload
    pub(crate) fn decode_payload(seq: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = Self::compute_crc(data);
        if actual != crc {
            return Err(SyncError::CacheCorruption(format!(
                "CRC mismatch at seq {}: stored {:08x}, computed {:08x}",
                seq, crc, actual
            )));
        }

        let record: LogRecord = bincode::deserialize(data)
            .map_err(|e| SyncError::CacheCorruption(format!("Undecodable record: {}", e)))?;

        if record.seq() != seq {
            return Err(SyncError::CacheCorruption(format!(
                "Header seq {} does not match record seq {}",
                seq,
                record.seq()
            )));
        }

        Ok(record)
    }

    pub fn compute_crc(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

/// Encode the file header: magic + version
pub fn file_header() -> [u8; FILE_HEADER_SIZE] {
    let mut header = [0u8; FILE_HEADER_SIZE];
    header[..4].copy_from_slice(MAGIC);
    header[4..].copy_from_slice(&VERSION.to_le_bytes());
    header
}

/// Check a file header read from disk
pub fn check_file_header(header: &[u8]) -> Result<()> {
    if header.len() < FILE_HEADER_SIZE || &header[..4] != MAGIC {
        return Err(SyncError::CacheCorruption(
            "Not a mutation cache log (bad magic)".to_string(),
        ));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(SyncError::CacheCorruption(format!(
            "Unsupported cache log version {} (expected {})",
            version, VERSION
        )));
    }
    Ok(())
}

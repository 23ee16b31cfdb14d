//! Command definitions
//!
//! Represents requests from clients.

use crate::store::{Record, RecordPatch};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Create = 0x01,
    Update = 0x02,
    Delete = 0x03,
    Get = 0x04,
    Sync = 0x05,
    Ping = 0x06,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a new record
    Create { record: Record },

    /// Update an existing record
    Update { id: String, patch: RecordPatch },

    /// Delete a record
    Delete { id: String },

    /// Read the current record
    Get { id: String },

    /// Run one reconciliation pass
    Sync,

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Create { .. } => CommandType::Create,
            Command::Update { .. } => CommandType::Update,
            Command::Delete { .. } => CommandType::Delete,
            Command::Get { .. } => CommandType::Get,
            Command::Sync => CommandType::Sync,
            Command::Ping => CommandType::Ping,
        }
    }
}

//! Response definitions
//!
//! Represents responses to clients.

use crate::error::SyncError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Created = 0x01,
    NoContent = 0x02,
    BadRequest = 0x03,
    NotFound = 0x04,
    Conflict = 0x05,
    Error = 0x06,
}

impl Status {
    /// Equivalent HTTP status code
    pub fn http_code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::Conflict => 409,
            Status::Error => 500,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::Created),
            0x02 => Some(Status::NoContent),
            0x03 => Some(Status::BadRequest),
            0x04 => Some(Status::NotFound),
            0x05 => Some(Status::Conflict),
            0x06 => Some(Status::Error),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Created | Status::NoContent)
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (record for GET, report for SYNC, message for errors)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn created() -> Self {
        Self {
            status: Status::Created,
            payload: None,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: Status::NoContent,
            payload: None,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Response for a failed command, carrying the error message
    pub fn from_error(err: &SyncError) -> Self {
        Self {
            status: err.status(),
            payload: Some(err.to_string().into_bytes()),
        }
    }

    /// Payload as text (error messages, PONG)
    pub fn payload_text(&self) -> Option<String> {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }
}

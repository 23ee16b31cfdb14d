//! Sink Module
//!
//! The durable tabular store that reconciled rows are written to.
//!
//! ## Responsibilities
//! - Load the rows written by the previous pass
//! - Replace the full row set in one operation
//!
//! ## Row Format
//! ```text
//! id,author,message,likes,image
//! ```
//! One row per record, no header line, rows ordered by id, empty last column
//! when the record has no image. The message is everything between the author
//! and the likes column, so it may contain commas.

mod csv;
mod memory;

pub use csv::CsvSink;
pub use memory::MemorySink;

use std::fmt;

use crate::error::{Result, SyncError};
use crate::store::Record;

/// Durable projection of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkRow {
    pub id: String,
    pub author: String,
    pub message: String,
    pub likes: u32,
    /// Empty when the record has no image
    pub image: String,
}

/// Destination for reconciled rows
pub trait TabularSink: Send + Sync {
    /// Read every row currently in the sink
    fn load(&self) -> Result<Vec<SinkRow>>;

    /// Replace the sink's contents with `rows`
    ///
    /// Either every row becomes visible or the previous contents remain.
    fn replace(&self, rows: &[SinkRow]) -> Result<()>;
}

impl SinkRow {
    /// Format as one sink line (without the newline)
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.id, self.author, self.message, self.likes, self.image
        )
    }

    /// Parse one sink line
    pub fn parse(line: &str) -> Result<Self> {
        let invalid = || SyncError::Storage(format!("Malformed sink row: {:?}", line));

        let (id, rest) = line.split_once(',').ok_or_else(invalid)?;
        let (author, rest) = rest.split_once(',').ok_or_else(invalid)?;
        let (rest, image) = rest.rsplit_once(',').ok_or_else(invalid)?;
        let (message, likes) = rest.rsplit_once(',').ok_or_else(invalid)?;
        let likes = likes.parse().map_err(|_| invalid())?;

        if id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            id: id.to_string(),
            author: author.to_string(),
            message: message.to_string(),
            likes,
            image: image.to_string(),
        })
    }

    pub fn into_record(self) -> Record {
        let image = if self.image.is_empty() {
            None
        } else {
            Some(self.image)
        };
        Record {
            id: self.id,
            author: self.author,
            message: self.message,
            likes: self.likes,
            image,
        }
    }
}

impl From<&Record> for SinkRow {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id.clone(),
            author: record.author.clone(),
            message: record.message.clone(),
            likes: record.likes,
            image: record.image.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for SinkRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

//! Record Store Module
//!
//! Authoritative in-memory table of current message records.
//!
//! ## Responsibilities
//! - Hold exactly one record per id
//! - Answer existence checks for validation
//! - Apply accepted mutations synchronously
//! - Rebuild from sink rows + pending cache entries on startup
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered ids (listing matches the sink's row order)
//! - Many concurrent readers, exclusive writer

mod table;

pub use table::RecordStore;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier (opaque token, usually a UUID string)
    pub id: String,
    pub author: String,
    pub message: String,
    pub likes: u32,
    pub image: Option<String>,
}

/// Fields carried by an update
///
/// `author`, `message` and `likes` are always written. `image` is written
/// only when `image_update` is set; `image_update` with `image: None` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub author: String,
    pub message: String,
    pub likes: u32,
    pub image: Option<String>,
    pub image_update: bool,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        message: impl Into<String>,
        likes: u32,
        image: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            message: message.into(),
            likes,
            image: non_empty(image),
        }
    }

    /// Store an empty image as no image, matching its sink row
    pub fn normalize_image(&mut self) {
        self.image = non_empty(self.image.take());
    }

    /// Check that every field can be written as one sink row
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        validate_fields(&self.author, &self.message, self.image.as_deref())
    }

    /// Merge a patch onto this record
    pub fn apply_patch(&mut self, patch: &RecordPatch) {
        self.author = patch.author.clone();
        self.message = patch.message.clone();
        self.likes = patch.likes;
        if patch.image_update {
            self.image = non_empty(patch.image.clone());
        }
    }
}

impl RecordPatch {
    /// Patch that leaves the image untouched
    pub fn keep_image(author: impl Into<String>, message: impl Into<String>, likes: u32) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            likes,
            image: None,
            image_update: false,
        }
    }

    /// Patch that overwrites the image (`None` clears it)
    pub fn set_image(
        author: impl Into<String>,
        message: impl Into<String>,
        likes: u32,
        image: Option<String>,
    ) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            likes,
            image,
            image_update: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        // An ignored image payload never reaches the sink
        let image = if self.image_update { self.image.as_deref() } else { None };
        validate_fields(&self.author, &self.message, image)
    }
}

/// Ids are the first sink column and must be non-empty
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(SyncError::InvalidRecord("id must not be empty".to_string()));
    }
    reject_chars("id", id, &[',', '\n', '\r'])
}

fn non_empty(image: Option<String>) -> Option<String> {
    image.filter(|i| !i.is_empty())
}

fn validate_fields(author: &str, message: &str, image: Option<&str>) -> Result<()> {
    reject_chars("author", author, &[',', '\n', '\r'])?;
    reject_chars("message", message, &['\n', '\r'])?;
    if let Some(image) = image {
        reject_chars("image", image, &[',', '\n', '\r'])?;
    }
    Ok(())
}

fn reject_chars(field: &str, value: &str, forbidden: &[char]) -> Result<()> {
    match value.chars().find(|c| forbidden.contains(c)) {
        Some(c) => Err(SyncError::InvalidRecord(format!(
            "{} contains forbidden character {:?}",
            field, c
        ))),
        None => Ok(()),
    }
}

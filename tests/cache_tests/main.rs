//! Mutation cache tests

mod reader_tests;

use msgsync::cache::Mutation;
use msgsync::{Record, RecordPatch};

/// A create mutation for `id`
pub fn create(id: &str) -> Mutation {
    Mutation::Create(Record::new(
        id,
        format!("author {}", id),
        format!("message {}", id),
        1,
        Some(format!("image {}", id)),
    ))
}

/// An update mutation for `id` that keeps the image
pub fn update(id: &str, message: &str) -> Mutation {
    Mutation::Update {
        id: id.to_string(),
        patch: RecordPatch::keep_image(format!("author {}", id), message, 2),
    }
}

pub fn delete(id: &str) -> Mutation {
    Mutation::Delete { id: id.to_string() }
}

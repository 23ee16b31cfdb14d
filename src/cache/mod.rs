//! Mutation Cache Module
//!
//! Durable, ordered log of accepted mutations that have not yet been
//! reconciled into the sink.
//!
//! ## Responsibilities
//! - Append each accepted mutation before it is acknowledged
//! - CRC32 checksums for corruption detection
//! - Sequence numbers for ordering, never reused across restarts
//! - Commit markers so a drained prefix stays drained after a crash
//! - Recovery and compaction on startup
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ File Header                             │
//! │ ┌───────────┬─────────────┐             │
//! │ │ "MSGC" (4)│ Version (2) │             │
//! │ └───────────┴─────────────┘             │
//! ├─────────────────────────────────────────┤
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ Seq (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! `Data` is a bincode-encoded [`LogRecord`]: either a mutation or a commit
//! marker covering every mutation up to its sequence number.

mod entry;
mod writer;
mod reader;
mod recovery;
mod queue;

pub use entry::{
    CacheEntry, LogRecord, Mutation, FILE_HEADER_SIZE, HEADER_SIZE, MAGIC, MAX_RECORD_SIZE,
    VERSION,
};
pub use writer::CacheWriter;
pub use reader::{CacheIterator, CacheReader};
pub use recovery::{CacheRecovery, RecoveryResult};
pub use queue::MutationCache;

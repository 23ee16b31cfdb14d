//! In-memory sink
//!
//! Keeps rows in memory; writes can be made to fail on demand.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::{Result, SyncError};

use super::{SinkRow, TabularSink};

/// Sink that keeps its rows in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: RwLock<Vec<SinkRow>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `replace` fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current rows
    pub fn rows(&self) -> Vec<SinkRow> {
        self.rows.read().clone()
    }

    /// Current rows formatted as sink lines
    pub fn lines(&self) -> Vec<String> {
        self.rows.read().iter().map(SinkRow::to_line).collect()
    }

    /// Number of successful `replace` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl TabularSink for MemorySink {
    fn load(&self) -> Result<Vec<SinkRow>> {
        Ok(self.rows())
    }

    fn replace(&self, rows: &[SinkRow]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::SinkWrite("sink unavailable".to_string()));
        }
        *self.rows.write() = rows.to_vec();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

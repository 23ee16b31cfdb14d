//! Sync Scheduler
//!
//! Background thread that triggers a reconciliation pass on a fixed cadence.
//! A failed pass is logged and simply retried on the next tick.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};

use crate::engine::Engine;
use crate::error::Result;

/// Handle to the running scheduler thread
pub struct SyncScheduler {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Start calling `engine.sync()` every `interval`
    pub fn spawn(engine: Arc<Engine>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("msgsync-scheduler".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => match engine.sync() {
                        Ok(report) if !report.is_idle() => {
                            tracing::debug!("Scheduled sync: {:?}", report)
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Scheduled sync failed, will retry: {}", e),
                    },
                    // Stop requested or handle dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Stop the scheduler and wait for an in-flight pass to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Scheduler thread panicked");
            }
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

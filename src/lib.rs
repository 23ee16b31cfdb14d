//! # msgsync
//!
//! A message store whose mutations reach a durable tabular sink through a
//! capacity-bounded reconciliation engine:
//! - Create/update/delete validated against an in-memory record store
//! - Accepted mutations logged to a crash-recoverable cache before they are
//!   acknowledged
//! - Sync passes that drain at most `batch_capacity` mutations per pass, in
//!   arrival order, and commit only after the sink write succeeded
//! - TCP-based client protocol with HTTP-equivalent status codes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Validator                               │
//! │            (Conflict / NotFound, per-id locks)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Mutation   │          │   Record    │
//!   │   Cache     │          │   Store     │
//!   └──────┬──────┘          └─────────────┘
//!          │ sync() ◄── scheduler / SYNC command
//!          ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Reconciler  │─────────►│    Sink     │
//!   │ (N per pass)│          │   (CSV)     │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod cache;
pub mod sink;
pub mod validator;
pub mod reconciler;
pub mod scheduler;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SyncError};
pub use config::Config;
pub use engine::Engine;
pub use reconciler::SyncReport;
pub use store::{Record, RecordPatch};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of msgsync
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

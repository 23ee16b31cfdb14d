//! Network Module
//!
//! TCP server, connection handling and a blocking client.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, shutdown flag)
//! - Worker thread pool fed through a bounded channel
//! - Commands routed through Engine

mod server;
mod connection;
mod client;

pub use server::Server;
pub use connection::Connection;
pub use client::Client;

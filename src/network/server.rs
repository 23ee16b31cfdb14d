//! TCP Server
//!
//! Accepts connections and dispatches them to a pool of worker threads.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, SyncError};
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the acceptor sleeps when no connection is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for msgsync
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listen address (called by `run` if needed)
    ///
    /// Returns the bound address, useful with port 0.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            SyncError::Network(format!("cannot bind {}: {}", self.config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        let addr = self.bind()?;
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => return Err(SyncError::Network("listener not bound".to_string())),
        };
        tracing::info!("Listening on {}", addr);

        let (conn_tx, conn_rx) = channel::bounded::<TcpStream>(self.config.max_connections);
        let workers: Vec<JoinHandle<()>> = (0..self.config.worker_threads)
            .map(|i| self.spawn_worker(i, conn_rx.clone()))
            .collect::<std::io::Result<_>>()?;
        drop(conn_rx);

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    match conn_tx.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(mut stream)) => {
                            tracing::warn!("Connection queue full, rejecting {}", peer);
                            let _ = write_response(&mut stream, &Response::error("server busy"));
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(SyncError::Network("all workers exited".to_string()));
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Shutting down, waiting for {} workers", workers.len());
        drop(conn_tx);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Connection worker panicked");
            }
        }
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Flag that stops the accept loop when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    fn spawn_worker(
        &self,
        index: usize,
        conn_rx: Receiver<TcpStream>,
    ) -> std::io::Result<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        thread::Builder::new()
            .name(format!("msgsync-worker-{}", index))
            .spawn(move || {
                for stream in conn_rx.iter() {
                    let result = Connection::new(stream, Arc::clone(&engine)).and_then(|mut conn| {
                        conn.set_timeouts(read_ms, write_ms)?;
                        conn.handle()
                    });
                    if let Err(e) = result {
                        tracing::debug!("Connection ended with error: {}", e);
                    }
                }
            })
    }
}

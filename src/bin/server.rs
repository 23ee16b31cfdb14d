//! msgsync Server Binary
//!
//! Starts the TCP server and the scheduled sync passes.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use msgsync::config::CacheSyncStrategy;
use msgsync::network::Server;
use msgsync::scheduler::SyncScheduler;
use msgsync::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// msgsync Server
#[derive(Parser, Debug)]
#[command(name = "msgsync-server")]
#[command(about = "Message store with a capacity-bounded reconciliation cache")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./msgsync_data")]
    data_dir: String,

    /// Sink file name inside the data directory
    #[arg(long, default_value = "results.csv")]
    sink_file: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Maximum connections waiting for a worker
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Maximum mutations committed per sync pass
    #[arg(short, long, default_value = "1000")]
    batch_capacity: usize,

    /// Milliseconds between scheduled sync passes (0 disables the scheduler)
    #[arg(short = 'i', long, default_value = "5000")]
    sync_interval_ms: u64,

    /// fsync the cache every N mutations instead of on every write
    #[arg(long)]
    fsync_every: Option<usize>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,msgsync=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("msgsync Server v{}", msgsync::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Batch capacity: {}", args.batch_capacity);

    let sync_strategy = match args.fsync_every {
        Some(count) => CacheSyncStrategy::EveryNEntries { count },
        None => CacheSyncStrategy::EveryWrite,
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sink_file(&args.sink_file)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .batch_capacity(args.batch_capacity)
        .sync_interval_ms(args.sync_interval_ms)
        .cache_sync_strategy(sync_strategy)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Engine initialized: {} records, {} pending mutations",
        engine.record_count(),
        engine.pending()
    );

    let scheduler = if config.sync_interval_ms > 0 {
        match SyncScheduler::spawn(
            Arc::clone(&engine),
            Duration::from_millis(config.sync_interval_ms),
        ) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!("Failed to start sync scheduler: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    // Start server
    let mut server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
    }
    tracing::info!("Server stopped");
}

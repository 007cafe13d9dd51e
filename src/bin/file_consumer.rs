//! File Consumer Binary - Live Data File to SQLite + CSV
//!
//! Tails a JSONL live data file, normalizes each message, stores it in SQLite with a
//! rolling sentiment aggregate, and appends it to a CSV log.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin file_consumer
//! ```
//!
//! ## Environment Variables
//!
//! - MESSAGE_INTERVAL_SECONDS - Seconds to sleep when no new messages arrive (required)
//! - LIVE_DATA_PATH - Path to the JSONL live data file (required)
//! - SQLITE_PATH - SQLite database path, recreated on every start (required)
//! - CSV_OUTPUT_PATH - CSV log path (default: data/live_data.csv)
//! - RUST_LOG - Logging level (optional, default: info)

use sentiflow::consumer_core::{
    ConsumerConfig, ConsumerSettings, FileConsumer, SqliteAggregateStore,
};
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("🚀 Starting message consumer process");

    let config = match ConsumerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Failed to read environment variables: {}", e);
            process::exit(1);
        }
    };

    log::info!("   Live data file: {}", config.source_path().display());
    log::info!("   SQLite database: {}", config.store_path().display());
    log::info!("   CSV log: {}", config.csv_path().display());
    log::info!("   Poll interval: {}s", config.interval().as_secs());

    // Delete previous database file if it exists
    if config.store_path().exists() {
        if let Err(e) = std::fs::remove_file(config.store_path()) {
            log::error!("❌ Failed to delete old DB file: {}", e);
            process::exit(2);
        }
    }

    // Fresh start: runs once, never per poll
    if let Err(e) = SqliteAggregateStore::new(config.store_path()).initialize() {
        log::error!("❌ Failed to initialize database: {}", e);
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("⚠️  Received CTRL+C, shutting down...");
                signal_token.cancel();
            }
            Err(err) => {
                log::error!("❌ Failed to listen for CTRL+C: {}", err);
            }
        }
    });

    log::info!("🔄 Press CTRL+C to shutdown gracefully");

    let mut consumer = FileConsumer::from_settings(&config);
    let state = consumer.run(shutdown).await;

    log::info!("✅ Consumer shutting down ({:?})", state);
    Ok(())
}

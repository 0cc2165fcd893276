//! Redis Log Adapter Binary

use clap::Parser;
use redis_log_adapter::config::{debug_enabled, process_env};
use redis_log_adapter::{adapter, source, AdapterError, AdapterRegistry, Result, Route};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Capacity of the channel between the record source and the adapter
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Parser)]
#[command(version, about = "Ship container log records into a Redis list")]
struct Cli {
    /// Destination route, e.g. redis://cache:6379?key=logstash
    #[arg(long, env = "ROUTE")]
    route: String,

    /// Newline-delimited JSON records to read; stdin when omitted
    #[arg(long, env = "INPUT")]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    initialize_tracing();

    let cli = Cli::parse();
    info!("Starting Redis log adapter v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        error!("Adapter failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // Register available adapters
    let mut registry = AdapterRegistry::new();
    adapter::register(&mut registry);

    // Build the adapter for the route, failing fast on an unreachable sink
    let route = Route::parse(&cli.route)?;
    let log_adapter = registry.create(&route).await?;

    // Open the record source
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    // Stream until the source is exhausted
    let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
    let feeder = tokio::spawn(source::forward_lines(reader, sender));

    let stats = log_adapter.stream(receiver).await;

    let sent = feeder
        .await
        .map_err(|e| AdapterError::Other(format!("record source task failed: {}", e)))??;

    info!(
        "Adapter finished - {} records read, {} shipped, {} filtered, {} dropped, {} unpublished",
        sent, stats.shipped, stats.filtered, stats.dropped, stats.unpublished
    );
    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let default_level = if debug_enabled(&process_env) { "debug" } else { "info" };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

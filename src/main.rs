//! httpfromtcp demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──bytes──▶ net::listener ──▶ http::buffer ──▶ http::request ──▶ handlers
//!        ▲                                                                  │
//!        └─────────────bytes──────────── http::response ◀───────────────────┘
//! ```
//!
//! One request per connection; the connection closes after the response.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use httpfromtcp::config::{load_config, ServerConfig};
use httpfromtcp::handlers::DemoHandler;
use httpfromtcp::lifecycle::signals::shutdown_signal;
use httpfromtcp::observability::{logging, metrics};

/// How long accepted connections get to finish after shutdown starts.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "httpfromtcp")]
#[command(about = "HTTP/1.1 server built directly on TCP", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!("httpfromtcp v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        read_buffer_size = config.http.read_buffer_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let handler = DemoHandler::new(config.demo.clone());
    let server = httpfromtcp::serve(&config, handler).await?;
    tracing::info!(address = %server.local_addr(), "Server started");

    shutdown_signal().await;
    server.close();

    let active = server.active_connections();
    if tokio::time::timeout(DRAIN_TIMEOUT, server.wait()).await.is_err() {
        tracing::warn!(active, "Connections still open after drain timeout");
    }

    tracing::info!("Server gracefully stopped");
    Ok(())
}

//! MCP Broker Entry Point
//!
//! Initializes logging, loads configuration, and serves the broker over the
//! configured transport. Live clients are shut down before exiting.

use std::sync::Arc;

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use mcp_broker::core::{BrokerServer, Config, TransportService};
use mcp_broker::domains::protocol::RmcpClientFactory;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    let transport = TransportService::new(config.transport.clone());
    let server = BrokerServer::new(config, Arc::new(RmcpClientFactory));

    info!("Broker initialized");

    let outcome = transport.run(server.clone()).await;

    info!("Broker shutting down");
    server.shutdown().await;

    outcome?;
    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs always go to stderr; stdout belongs to the STDIO transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

//! MCP Broker Library
//!
//! This crate keeps a registry of connections to Model Context Protocol
//! servers and brokers tool discovery and invocation across them.
//!
//! # Architecture
//!
//! The broker is organized into the following modules:
//!
//! - **core**: Configuration, error handling, the procedure surface and transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **connections**: Connection configurations and the live client registry
//!   - **protocol**: The protocol client abstraction and its rmcp implementation
//!   - **tools**: Tool listing and invocation against active connections
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mcp_broker::{BrokerServer, Config};
//! use mcp_broker::domains::protocol::RmcpClientFactory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = BrokerServer::new(Config::from_env(), Arc::new(RmcpClientFactory));
//!     let connection = server
//!         .add_http_connection("search", "https://example.com/mcp")
//!         .await?;
//!     let tools = server.list_tools(&connection.id).await?;
//!     println!("{} tools available", tools.len());
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{BrokerServer, Config, Error, Result};

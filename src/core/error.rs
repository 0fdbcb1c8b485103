//! Error types and handling for the MCP broker.
//!
//! This module defines a unified error type that can represent errors from
//! all domains and external dependencies, providing consistent error handling
//! across the entire application.

use thiserror::Error;

/// A specialized Result type for broker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the MCP broker.
///
/// This enum captures every failure a request surface procedure can report,
/// so transports only need one mapping to caller-facing error codes.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the connection registry.
    #[error("Connection error: {0}")]
    Registry(#[from] crate::domains::connections::RegistryError),

    /// Error originating from the tool broker.
    #[error("Tool error: {0}")]
    Broker(#[from] crate::domains::tools::BrokerError),

    /// The operation is not available in this environment.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// A connection id did not match any configured connection.
    #[error("Connection not found: {0}")]
    NotFound(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new "unsupported" error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new "not found" error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}

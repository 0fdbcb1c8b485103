//! Tool broker error types.

use thiserror::Error;

use crate::domains::protocol::ClientError;

/// Errors that can occur while brokering tool requests.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No live client is registered for the connection, either because it
    /// never existed or because it was removed.
    #[error("MCP connection not found or not active: {0}")]
    ConnectionNotActive(String),

    /// The client failed; passed through exactly as raised.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl BrokerError {
    /// Create a new "not active" error.
    pub fn not_active(id: impl Into<String>) -> Self {
        Self::ConnectionNotActive(id.into())
    }
}

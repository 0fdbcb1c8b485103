//! Connection registry error types.

use thiserror::Error;

use crate::domains::protocol::ClientError;

/// Errors that can occur while creating or managing connections.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The connection parameters were rejected before any client was built.
    #[error("Invalid connection: {0}")]
    Validation(String),

    /// The protocol client could not be constructed or failed its handshake.
    /// Neither the configuration nor a live client is retained for `id`.
    #[error("Failed to initialize MCP connection '{name}' ({id}): {source}")]
    InitializationFailed {
        id: String,
        name: String,
        #[source]
        source: ClientError,
    },
}

impl RegistryError {
    /// Create a new validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a client failure with the connection it was meant for.
    pub fn initialization(
        id: impl Into<String>,
        name: impl Into<String>,
        source: ClientError,
    ) -> Self {
        Self::InitializationFailed {
            id: id.into(),
            name: name.into(),
            source,
        }
    }
}

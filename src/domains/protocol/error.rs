//! Protocol client error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a protocol client while talking to a tool provider.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The provider process could not be started.
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The transport could not be opened or the handshake was rejected.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The handshake did not complete in time.
    #[error("Initialization timed out after {0:?}")]
    Timeout(Duration),

    /// The client has not been initialized, or was already shut down.
    #[error("Client is not initialized")]
    NotInitialized,

    /// `initialize` was called on a client that is already running.
    #[error("Client is already initialized")]
    AlreadyInitialized,

    /// Tool arguments were not a JSON object.
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// The provider answered a request with an error or the session broke.
    #[error("Service error: {0}")]
    Service(String),

    /// A provider payload could not be converted.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Create a new spawn error.
    pub fn spawn(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Spawn {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a new connection error.
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    /// Create a new service error.
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }
}

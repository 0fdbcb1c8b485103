//! Protocol client contract consumed by the registry and the broker.
//!
//! A client is bound to exactly one connection. The registry drives its
//! lifecycle (`initialize` once, `shutdown` on removal); the broker only ever
//! calls `list_tools` and `call_tool`, possibly from several tasks at once.

use std::sync::Arc;

use serde_json::Value;

use super::error::ClientError;
use super::types::ToolDescriptor;
use crate::domains::connections::Connection;

/// A live session with one tool provider.
#[async_trait::async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Open the transport and perform the MCP handshake.
    ///
    /// Must be called exactly once, before any other method.
    async fn initialize(&self) -> Result<(), ClientError>;

    /// List every tool the provider exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError>;

    /// Invoke `name` with opaque `arguments` and return the provider's result.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError>;

    /// Release transport resources. Clients without any default to a no-op.
    async fn shutdown(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Builds an uninitialized client for a connection.
pub trait ClientFactory: Send + Sync {
    fn create(&self, connection: &Connection) -> Result<Arc<dyn ProtocolClient>, ClientError>;
}

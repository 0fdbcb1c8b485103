//! Tool Broker - routes tool requests to the right live client.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument};

use super::error::BrokerError;
use crate::domains::connections::ConnectionRegistry;
use crate::domains::protocol::{ProtocolClient, ToolDescriptor};

/// Forwards `list_tools` / `call_tool` to the client of a connection.
///
/// The registry lock is only taken to clone the client handle; the provider
/// round trip itself runs unsynchronized, so calls on different connections,
/// or several calls on the same one, proceed in parallel.
#[derive(Clone)]
pub struct ToolBroker {
    registry: Arc<ConnectionRegistry>,
}

impl ToolBroker {
    /// Create a broker reading clients from `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    async fn client(&self, connection_id: &str) -> Result<Arc<dyn ProtocolClient>, BrokerError> {
        self.registry
            .live_client(connection_id)
            .await
            .ok_or_else(|| BrokerError::not_active(connection_id))
    }

    /// List the tools exposed by a connection's provider.
    #[instrument(skip(self))]
    pub async fn list_tools(&self, connection_id: &str) -> Result<Vec<ToolDescriptor>, BrokerError> {
        let client = self.client(connection_id).await?;
        info!("Listing tools for connection: {}", connection_id);

        match client.list_tools().await {
            Ok(tools) => {
                debug!("Tools listed successfully for {}: {:?}", connection_id, tools);
                Ok(tools)
            }
            Err(e) => {
                error!("Error listing tools for {}: {}", connection_id, e);
                Err(e.into())
            }
        }
    }

    /// Call `tool_name` on a connection's provider with opaque `params`.
    #[instrument(skip(self, params))]
    pub async fn call_tool(
        &self,
        connection_id: &str,
        tool_name: &str,
        params: Value,
    ) -> Result<Value, BrokerError> {
        let client = self.client(connection_id).await?;
        debug!(
            "Calling tool \"{}\" on connection {} with params: {}",
            tool_name, connection_id, params
        );

        match client.call_tool(tool_name, params).await {
            Ok(result) => {
                debug!(
                    "Tool \"{}\" called successfully for {}: {}",
                    tool_name, connection_id, result
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    "Error calling tool \"{}\" for {}: {}",
                    tool_name, connection_id, e
                );
                Err(e.into())
            }
        }
    }
}

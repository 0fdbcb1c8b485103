//! Protocol client backed by the rmcp SDK.
//!
//! HTTP connections use the streamable HTTP client transport; stdio
//! connections spawn the configured command and talk over its stdin/stdout.

use std::sync::Arc;

use rmcp::{
    RoleClient, ServiceExt,
    model::CallToolRequestParam,
    service::{Peer, RunningService},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use super::client::{ClientFactory, ProtocolClient};
use super::error::ClientError;
use super::types::ToolDescriptor;
use crate::domains::connections::{Connection, ConnectionTransport};

type ClientSession = RunningService<RoleClient, ()>;

/// Session lifecycle; a client moves strictly forward through these states.
enum SessionState {
    Idle,
    Running(ClientSession),
    Closed,
}

/// MCP client for a single connection.
pub struct RmcpClient {
    connection: Connection,
    state: RwLock<SessionState>,
}

impl RmcpClient {
    /// Create an uninitialized client for `connection`.
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            state: RwLock::new(SessionState::Idle),
        }
    }

    /// The connection this client is bound to.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Handle for issuing requests without holding the state lock.
    async fn peer(&self) -> Result<Peer<RoleClient>, ClientError> {
        match &*self.state.read().await {
            SessionState::Running(session) => Ok(session.peer().clone()),
            _ => Err(ClientError::NotInitialized),
        }
    }

    async fn connect(&self) -> Result<ClientSession, ClientError> {
        match &self.connection.transport {
            ConnectionTransport::Http { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.as_str());
                ().serve(transport)
                    .await
                    .map_err(|e| ClientError::connect(e.to_string()))
            }
            ConnectionTransport::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                cmd.args(args).envs(env);

                let transport = TokioChildProcess::new(cmd)
                    .map_err(|e| ClientError::spawn(command, e.to_string()))?;
                ().serve(transport)
                    .await
                    .map_err(|e| ClientError::connect(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl ProtocolClient for RmcpClient {
    #[instrument(skip(self), fields(connection = %self.connection.id))]
    async fn initialize(&self) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        if !matches!(*state, SessionState::Idle) {
            return Err(ClientError::AlreadyInitialized);
        }

        match self.connect().await {
            Ok(session) => {
                info!("MCP session established for {}", self.connection);
                *state = SessionState::Running(session);
                Ok(())
            }
            Err(e) => {
                *state = SessionState::Closed;
                Err(e)
            }
        }
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        let peer = self.peer().await?;
        let tools = peer
            .list_all_tools()
            .await
            .map_err(|e| ClientError::service(e.to_string()))?;

        tools
            .into_iter()
            .map(|tool| -> Result<ToolDescriptor, ClientError> {
                Ok(serde_json::from_value(serde_json::to_value(tool)?)?)
            })
            .collect()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        let arguments = match arguments {
            Value::Null => None,
            Value::Object(map) => Some(map),
            other => {
                return Err(ClientError::invalid_arguments(format!(
                    "expected a JSON object, got {other}"
                )));
            }
        };

        let mut request = serde_json::Map::new();
        request.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(arguments) = arguments {
            request.insert("arguments".to_string(), Value::Object(arguments));
        }
        let request: CallToolRequestParam = serde_json::from_value(Value::Object(request))?;

        let peer = self.peer().await?;
        let result = peer
            .call_tool(request)
            .await
            .map_err(|e| ClientError::service(e.to_string()))?;

        Ok(serde_json::to_value(result)?)
    }

    #[instrument(skip(self), fields(connection = %self.connection.id))]
    async fn shutdown(&self) -> Result<(), ClientError> {
        let mut state = self.state.write().await;
        if let SessionState::Running(session) = std::mem::replace(&mut *state, SessionState::Closed) {
            let reason = session
                .cancel()
                .await
                .map_err(|e| ClientError::service(e.to_string()))?;
            debug!("MCP session closed: {:?}", reason);
        }
        Ok(())
    }
}

/// Factory producing [`RmcpClient`]s; the one used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct RmcpClientFactory;

impl ClientFactory for RmcpClientFactory {
    fn create(&self, connection: &Connection) -> Result<Arc<dyn ProtocolClient>, ClientError> {
        Ok(Arc::new(RmcpClient::new(connection.clone())))
    }
}

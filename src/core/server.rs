//! Broker server and lifecycle management.
//!
//! `BrokerServer` is the object every request surface talks to. It is built
//! once at startup, owns the connection registry and the tool broker, and
//! exposes one method per surface procedure. Procedure-level policy lives
//! here: which connection types may be created in this environment, and how
//! a missing connection is reported.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::config::Config;
use super::error::{Error, Result};
use crate::domains::{
    connections::{Connection, ConnectionRegistry, NewConnection},
    protocol::{ClientFactory, ToolDescriptor},
    tools::ToolBroker,
};

/// The broker service shared by all request surfaces.
#[derive(Clone)]
pub struct BrokerServer {
    /// Service configuration.
    config: Arc<Config>,

    /// Registry of connections and live clients.
    registry: Arc<ConnectionRegistry>,

    /// Forwards tool requests to live clients.
    broker: ToolBroker,
}

impl BrokerServer {
    /// Create a new broker using `factory` to build protocol clients.
    pub fn new(config: Config, factory: Arc<dyn ClientFactory>) -> Self {
        let config = Arc::new(config);

        let mut registry = ConnectionRegistry::new(factory);
        if let Some(timeout) = config.registry.init_timeout() {
            registry = registry.with_init_timeout(timeout);
        }
        let registry = Arc::new(registry);

        Self {
            broker: ToolBroker::new(registry.clone()),
            registry,
            config,
        }
    }

    /// Get the service name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the service version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the service configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    // ========================================================================
    // Connection management
    // ========================================================================

    /// Create a connection to a provider reachable over HTTP.
    #[instrument(skip(self))]
    pub async fn add_http_connection(&self, name: &str, url: &str) -> Result<Connection> {
        let request = NewConnection::http(name, url)?;
        Ok(self.registry.add_connection(request).await?)
    }

    /// Create a connection to a provider started as a child process.
    ///
    /// Refused when process spawning is disabled in this environment.
    #[instrument(skip(self, env))]
    pub async fn add_stdio_connection(
        &self,
        name: &str,
        command: &str,
        args: Vec<String>,
        env: BTreeMap<String, String>,
    ) -> Result<Connection> {
        if !self.config.registry.allow_stdio {
            warn!("Rejected stdio connection '{}': process spawning disabled", name);
            return Err(Error::unsupported(
                "stdio connections can only be added where process spawning is allowed",
            ));
        }

        let request = NewConnection::stdio(name, command, args).with_env(env);
        Ok(self.registry.add_connection(request).await?)
    }

    /// List every configured connection.
    pub async fn list_connections(&self) -> Vec<Connection> {
        self.registry.list_connections().await
    }

    /// Fetch one connection's configuration.
    pub async fn get_connection(&self, id: &str) -> Result<Connection> {
        self.registry
            .get_connection(id)
            .await
            .ok_or_else(|| Error::not_found(id))
    }

    /// Remove a connection; `true` when its configuration existed.
    pub async fn remove_connection(&self, id: &str) -> bool {
        self.registry.remove_connection(id).await
    }

    // ========================================================================
    // Tool interaction
    // ========================================================================

    /// List the tools of a connection.
    pub async fn list_tools(&self, connection_id: &str) -> Result<Vec<ToolDescriptor>> {
        Ok(self.broker.list_tools(connection_id).await?)
    }

    /// Call a tool on a connection.
    pub async fn call_tool(
        &self,
        connection_id: &str,
        tool_name: &str,
        params: Value,
    ) -> Result<Value> {
        Ok(self.broker.call_tool(connection_id, tool_name, params).await?)
    }

    /// Tear every connection down; called once the surfaces have stopped.
    pub async fn shutdown(&self) {
        info!(
            "Shutting down broker with {} connection(s)",
            self.registry.len().await
        );
        self.registry.shutdown_all().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RegistryConfig;
    use crate::domains::connections::RegistryError;
    use crate::domains::protocol::mock::MockFactory;
    use crate::domains::tools::BrokerError;

    fn server_with(config: Config) -> (BrokerServer, Arc<MockFactory>) {
        let factory = Arc::new(MockFactory::default());
        (BrokerServer::new(config, factory.clone()), factory)
    }

    #[tokio::test]
    async fn test_add_http_connection_validates_url() {
        let (server, factory) = server_with(Config::default());

        let err = server.add_http_connection("search", "::bad::").await.unwrap_err();
        assert!(matches!(err, Error::Registry(RegistryError::Validation(_))));
        assert_eq!(factory.created_count(), 0);
    }

    #[tokio::test]
    async fn test_stdio_refused_when_spawning_disabled() {
        let config = Config {
            registry: RegistryConfig {
                allow_stdio: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let (server, factory) = server_with(config);

        let err = server
            .add_stdio_connection("git", "uvx", vec![], BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert_eq!(factory.created_count(), 0);

        // HTTP connections are unaffected.
        assert!(server
            .add_http_connection("search", "https://example.com/mcp")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_stdio_connection_carries_env() {
        let (server, factory) = server_with(Config::default());
        let env = BTreeMap::from([("TOKEN".to_string(), "abc".to_string())]);

        let connection = server
            .add_stdio_connection("gh", "npx", vec!["-y".into()], env.clone())
            .await
            .unwrap();

        assert_eq!(factory.last().connection, connection);
        match connection.transport {
            crate::domains::connections::ConnectionTransport::Stdio { env: stored, .. } => {
                assert_eq!(stored, env)
            }
            _ => panic!("expected stdio transport"),
        }
    }

    #[tokio::test]
    async fn test_get_unknown_connection_is_not_found() {
        let (server, _) = server_with(Config::default());
        let err = server.get_connection("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref id) if id == "nope"));
    }

    #[tokio::test]
    async fn test_tools_on_unknown_connection_not_active() {
        let (server, _) = server_with(Config::default());
        let err = server.list_tools("nope").await.unwrap_err();
        assert!(matches!(err, Error::Broker(BrokerError::ConnectionNotActive(_))));
    }

    #[tokio::test]
    async fn test_shutdown_clears_registry() {
        let (server, factory) = server_with(Config::default());
        server
            .add_http_connection("search", "https://example.com/mcp")
            .await
            .unwrap();

        server.shutdown().await;

        assert!(server.list_connections().await.is_empty());
        assert_eq!(factory.last().shutdowns(), 1);
    }
}

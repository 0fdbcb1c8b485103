//! Connection Registry - owns connection configuration and live clients.
//!
//! Both maps sit behind a single lock so that inserting a connection together
//! with its client, or removing both, is never observed half done. The lock
//! is only held for map access; client handshakes and shutdowns run outside it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::error::RegistryError;
use super::types::{Connection, NewConnection};
use crate::domains::protocol::{ClientError, ClientFactory, ProtocolClient};

/// Upper bound on a single client shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct RegistryState {
    /// Key: connection id, Value: connection configuration
    connections: HashMap<String, Connection>,

    /// Key: connection id, Value: initialized client
    clients: HashMap<String, Arc<dyn ProtocolClient>>,
}

/// Registry of MCP connections and their live clients.
///
/// Constructed once at startup and shared by `Arc` with the tool broker and
/// the request surface.
pub struct ConnectionRegistry {
    factory: Arc<dyn ClientFactory>,
    init_timeout: Option<Duration>,
    shutdown_timeout: Duration,
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Create an empty registry building clients with `factory`.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        info!("Initializing ConnectionRegistry");
        Self {
            factory,
            init_timeout: None,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Bound client initialization by `timeout`.
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = Some(timeout);
        self
    }

    /// Give up waiting on a client shutdown after `timeout`.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Validate `request`, start a client for it and register both.
    ///
    /// Either the configuration and the live client are both stored, or
    /// neither is.
    #[instrument(skip_all, fields(name = %request.name, kind = request.transport.kind()))]
    pub async fn add_connection(&self, request: NewConnection) -> Result<Connection, RegistryError> {
        request.validate()?;

        let connection = request.into_connection(Uuid::new_v4().to_string());
        info!("Adding MCP connection: {}", connection);

        let client = match self.start_client(&connection).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to add MCP connection {}: {}", connection.id, e);
                return Err(RegistryError::initialization(
                    connection.id,
                    connection.name,
                    e,
                ));
            }
        };

        {
            let mut state = self.state.write().await;
            state
                .connections
                .insert(connection.id.clone(), connection.clone());
            state.clients.insert(connection.id.clone(), client);
        }

        info!("MCP connection added successfully: {}", connection.id);
        Ok(connection)
    }

    /// Construct and initialize a client, shutting it down again on failure.
    async fn start_client(
        &self,
        connection: &Connection,
    ) -> Result<Arc<dyn ProtocolClient>, ClientError> {
        let client = self.factory.create(connection)?;

        let outcome = match self.init_timeout {
            Some(limit) => tokio::time::timeout(limit, client.initialize())
                .await
                .unwrap_or(Err(ClientError::Timeout(limit))),
            None => client.initialize().await,
        };

        if let Err(e) = outcome {
            if let Err(shutdown_err) = self.stop_client(client.as_ref()).await {
                debug!(
                    "Shutdown after failed initialization of {} also failed: {}",
                    connection.id, shutdown_err
                );
            }
            return Err(e);
        }

        Ok(client)
    }

    /// Shut `client` down, abandoning it once the shutdown timeout elapses.
    async fn stop_client(&self, client: &dyn ProtocolClient) -> Result<(), ClientError> {
        tokio::time::timeout(self.shutdown_timeout, client.shutdown())
            .await
            .unwrap_or(Err(ClientError::Timeout(self.shutdown_timeout)))
    }

    /// Snapshot of every configured connection, ordered by name then id.
    pub async fn list_connections(&self) -> Vec<Connection> {
        let state = self.state.read().await;
        let mut connections: Vec<Connection> = state.connections.values().cloned().collect();
        connections.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        connections
    }

    /// Look up a connection's configuration.
    pub async fn get_connection(&self, id: &str) -> Option<Connection> {
        self.state.read().await.connections.get(id).cloned()
    }

    /// Look up the live client for a connection.
    pub async fn live_client(&self, id: &str) -> Option<Arc<dyn ProtocolClient>> {
        self.state.read().await.clients.get(id).cloned()
    }

    /// Remove a connection and shut its client down.
    ///
    /// Returns whether a configuration entry existed, whatever the state of
    /// the live client.
    #[instrument(skip(self))]
    pub async fn remove_connection(&self, id: &str) -> bool {
        info!("Removing MCP connection: {}", id);

        let (client, connection) = {
            let mut state = self.state.write().await;
            (state.clients.remove(id), state.connections.remove(id))
        };

        match client {
            Some(client) => {
                debug!("MCP client found for {}, shutting it down", id);
                if let Err(e) = self.stop_client(client.as_ref()).await {
                    warn!("MCP client for {} did not shut down cleanly: {}", id, e);
                }
            }
            None => warn!("No active MCP client found for connection ID: {}", id),
        }

        match connection {
            Some(_) => {
                info!("MCP connection configuration removed: {}", id);
                true
            }
            None => {
                warn!("MCP connection configuration not found for removal: {}", id);
                false
            }
        }
    }

    /// Drop every connection and shut all live clients down concurrently.
    pub async fn shutdown_all(&self) {
        let clients: Vec<(String, Arc<dyn ProtocolClient>)> = {
            let mut state = self.state.write().await;
            state.connections.clear();
            state.clients.drain().collect()
        };

        if clients.is_empty() {
            return;
        }
        info!("Shutting down {} MCP client(s)", clients.len());

        let results =
            join_all(clients.iter().map(|(_, client)| self.stop_client(client.as_ref()))).await;
        for ((id, _), result) in clients.iter().zip(results) {
            if let Err(e) = result {
                warn!("MCP client for {} did not shut down cleanly: {}", id, e);
            }
        }
    }

    /// Number of configured connections.
    pub async fn len(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Whether no connection is configured.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.connections.is_empty()
    }

    /// Number of connections with a live client.
    pub async fn active_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    /// Drop the live client for `id` but keep its configuration.
    #[cfg(test)]
    pub(crate) async fn detach_client(&self, id: &str) -> Option<Arc<dyn ProtocolClient>> {
        self.state.write().await.clients.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::protocol::mock::{MockBehavior, MockFactory};
    use std::collections::HashSet;
    use tokio_test::assert_ok;

    fn registry_with(factory: Arc<MockFactory>) -> ConnectionRegistry {
        ConnectionRegistry::new(factory)
    }

    fn search_request() -> NewConnection {
        NewConnection::http("search", "https://example.com/mcp").unwrap()
    }

    #[tokio::test]
    async fn test_add_then_get_returns_input_with_fresh_id() {
        let registry = registry_with(Arc::new(MockFactory::default()));
        let request = search_request();

        let connection = assert_ok!(registry.add_connection(request.clone()).await);
        assert!(!connection.id.is_empty());
        assert_eq!(connection.name, request.name);
        assert_eq!(connection.transport, request.transport);

        let stored = registry.get_connection(&connection.id).await;
        assert_eq!(stored, Some(connection.clone()));
        assert!(registry.list_connections().await.contains(&connection));
        assert!(registry.live_client(&connection.id).await.is_some());
    }

    #[tokio::test]
    async fn test_add_initializes_client_once() {
        let factory = Arc::new(MockFactory::default());
        let registry = registry_with(factory.clone());

        registry.add_connection(search_request()).await.unwrap();
        let client = factory.last();
        assert_eq!(
            client.initialize_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_initialize_leaves_no_state() {
        let factory = Arc::new(MockFactory::failing_initialize());
        let registry = registry_with(factory.clone());

        let err = registry.add_connection(search_request()).await.unwrap_err();
        let RegistryError::InitializationFailed { id, name, .. } = err else {
            panic!("expected InitializationFailed");
        };

        assert_eq!(name, "search");
        assert!(registry.get_connection(&id).await.is_none());
        assert!(registry.live_client(&id).await.is_none());
        assert!(registry.is_empty().await);
        assert_eq!(factory.last().shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_state() {
        let factory = Arc::new(MockFactory::new(MockBehavior {
            fail_create: true,
            ..Default::default()
        }));
        let registry = registry_with(factory);

        let err = registry.add_connection(search_request()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InitializationFailed {
                source: ClientError::Spawn { .. },
                ..
            }
        ));
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_initialize_timeout_is_initialization_failure() {
        let factory = Arc::new(MockFactory::new(MockBehavior {
            initialize_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        }));
        let registry =
            registry_with(factory.clone()).with_init_timeout(Duration::from_millis(20));

        let err = registry.add_connection(search_request()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InitializationFailed {
                source: ClientError::Timeout(_),
                ..
            }
        ));
        assert_eq!(registry.active_count().await, 0);
        assert_eq!(factory.last().shutdowns(), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_builds_no_client() {
        let factory = Arc::new(MockFactory::default());
        let registry = registry_with(factory.clone());

        let err = registry
            .add_connection(NewConnection::stdio("", "uvx", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
        assert_eq!(factory.created_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_unknown_returns_false() {
        let registry = registry_with(Arc::new(MockFactory::default()));
        assert!(!registry.remove_connection("never-added").await);
    }

    #[tokio::test]
    async fn test_remove_existing_returns_true_and_shuts_down() {
        let factory = Arc::new(MockFactory::default());
        let registry = registry_with(factory.clone());
        let connection = registry.add_connection(search_request()).await.unwrap();

        assert!(registry.remove_connection(&connection.id).await);
        assert!(registry.get_connection(&connection.id).await.is_none());
        assert!(registry.live_client(&connection.id).await.is_none());
        assert_eq!(factory.last().shutdowns(), 1);

        assert!(!registry.remove_connection(&connection.id).await);
    }

    #[tokio::test]
    async fn test_remove_with_dangling_configuration() {
        let registry = registry_with(Arc::new(MockFactory::default()));
        let connection = registry.add_connection(search_request()).await.unwrap();

        assert!(registry.detach_client(&connection.id).await.is_some());
        assert_eq!(registry.active_count().await, 0);
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove_connection(&connection.id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_adds_get_distinct_ids() {
        let registry = Arc::new(registry_with(Arc::new(MockFactory::default())));

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .add_connection(NewConnection::stdio(
                            format!("provider-{i}"),
                            "node",
                            vec![format!("server-{i}.js")],
                        ))
                        .await
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            let connection = task.await.unwrap().unwrap();
            assert!(ids.insert(connection.id));
        }

        assert_eq!(ids.len(), 32);
        assert_eq!(registry.len().await, 32);
        assert_eq!(registry.active_count().await, 32);
    }

    #[tokio::test]
    async fn test_list_connections_is_sorted_by_name() {
        let registry = registry_with(Arc::new(MockFactory::default()));
        for name in ["zeta", "alpha", "mid"] {
            registry
                .add_connection(NewConnection::stdio(name, "node", vec![]))
                .await
                .unwrap();
        }

        let names: Vec<_> = registry
            .list_connections()
            .await
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_shutdown_all_drains_and_stops_clients() {
        let factory = Arc::new(MockFactory::default());
        let registry = registry_with(factory.clone());
        registry.add_connection(search_request()).await.unwrap();
        registry
            .add_connection(NewConnection::stdio("git", "uvx", vec![]))
            .await
            .unwrap();

        registry.shutdown_all().await;

        assert!(registry.is_empty().await);
        assert_eq!(registry.active_count().await, 0);
        for client in factory.created.lock().unwrap().iter() {
            assert_eq!(client.shutdowns(), 1);
        }
    }

    #[tokio::test]
    async fn test_remove_returns_while_call_in_flight() {
        let factory = Arc::new(MockFactory::new(MockBehavior {
            hang_calls: true,
            hang_shutdown: true,
            ..Default::default()
        }));
        let registry = registry_with(factory.clone())
            .with_shutdown_timeout(Duration::from_millis(50));
        let connection = registry.add_connection(search_request()).await.unwrap();

        let client = registry.live_client(&connection.id).await.unwrap();
        let call =
            tokio::spawn(async move { client.call_tool("slow", serde_json::json!({})).await });
        while factory.last().calls.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let removed = tokio::time::timeout(
            Duration::from_secs(2),
            registry.remove_connection(&connection.id),
        )
        .await;
        assert_eq!(removed, Ok(true));
        assert!(registry.is_empty().await);
        assert_eq!(factory.last().shutdowns(), 1);
        assert!(!call.is_finished());
        call.abort();
    }

    #[tokio::test]
    async fn test_shutdown_all_gives_up_on_stuck_clients() {
        let factory = Arc::new(MockFactory::new(MockBehavior {
            hang_shutdown: true,
            ..Default::default()
        }));
        let registry = registry_with(factory).with_shutdown_timeout(Duration::from_millis(50));
        registry.add_connection(search_request()).await.unwrap();

        let finished = tokio::time::timeout(Duration::from_secs(2), registry.shutdown_all()).await;
        assert!(finished.is_ok());
        assert!(registry.is_empty().await);
    }
}

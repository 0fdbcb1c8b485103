//! In-memory protocol clients for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use super::client::{ClientFactory, ProtocolClient};
use super::error::ClientError;
use super::types::ToolDescriptor;
use crate::domains::connections::Connection;

/// Scripted behaviour shared by every client a [`MockFactory`] creates.
#[derive(Clone, Default)]
pub struct MockBehavior {
    pub fail_create: bool,
    pub fail_initialize: bool,
    pub initialize_delay: Option<Duration>,
    pub tools: Vec<ToolDescriptor>,
    pub call_result: Value,
    pub fail_calls: bool,
    /// `call_tool` never resolves.
    pub hang_calls: bool,
    /// `shutdown` never resolves.
    pub hang_shutdown: bool,
}

pub struct MockClient {
    pub connection: Connection,
    behavior: MockBehavior,
    pub initialize_calls: AtomicUsize,
    pub shutdown_calls: AtomicUsize,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockClient {
    pub fn shutdowns(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProtocolClient for MockClient {
    async fn initialize(&self) -> Result<(), ClientError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.behavior.initialize_delay {
            tokio::time::sleep(delay).await;
        }
        if self.behavior.fail_initialize {
            return Err(ClientError::connect("handshake refused"));
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ClientError> {
        if self.behavior.fail_calls {
            return Err(ClientError::service("provider unavailable"));
        }
        Ok(self.behavior.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        if self.behavior.hang_calls {
            std::future::pending::<()>().await;
        }
        if self.behavior.fail_calls {
            return Err(ClientError::service("provider unavailable"));
        }
        Ok(self.behavior.call_result.clone())
    }

    async fn shutdown(&self) -> Result<(), ClientError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior.hang_shutdown {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Factory handing out [`MockClient`]s and remembering each one.
#[derive(Default)]
pub struct MockFactory {
    behavior: MockBehavior,
    pub created: Mutex<Vec<Arc<MockClient>>>,
}

impl MockFactory {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_initialize() -> Self {
        Self::new(MockBehavior {
            fail_initialize: true,
            ..Default::default()
        })
    }

    pub fn last(&self) -> Arc<MockClient> {
        self.created.lock().unwrap().last().cloned().expect("no client created")
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl ClientFactory for MockFactory {
    fn create(&self, connection: &Connection) -> Result<Arc<dyn ProtocolClient>, ClientError> {
        if self.behavior.fail_create {
            return Err(ClientError::spawn("mock", "not allowed"));
        }

        let client = Arc::new(MockClient {
            connection: connection.clone(),
            behavior: self.behavior.clone(),
            initialize_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        });
        self.created.lock().unwrap().push(client.clone());
        Ok(client)
    }
}

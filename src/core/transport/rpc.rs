//! JSON-RPC request surface shared by every transport.
//!
//! Each procedure validates its params, calls into [`BrokerServer`] and maps
//! the outcome to a JSON-RPC response. Transports only move these messages.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use crate::core::{BrokerServer, Error};
use crate::domains::connections::RegistryError;
use crate::domains::tools::BrokerError;

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Error codes returned by the surface.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters, including rejected connection settings.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
    /// No live client for the connection.
    pub const CONNECTION_NOT_ACTIVE: i32 = -32001;
    /// The provider could not be started or refused the handshake.
    pub const INITIALIZATION_FAILED: i32 = -32002;
    /// The provider failed while listing or calling tools.
    pub const CLIENT_ERROR: i32 = -32003;
    /// The operation is not available in this environment.
    pub const NOT_SUPPORTED: i32 = -32004;
    /// No connection with the given id.
    pub const CONNECTION_NOT_FOUND: i32 = -32005;
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Attach structured data to an error response.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.data = Some(data);
        }
        self
    }

    /// Parse error, for payloads that are not JSON-RPC at all.
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::error(None, error_codes::PARSE_ERROR, msg)
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>) -> Self {
        Self::error(id, error_codes::METHOD_NOT_FOUND, "Method not found")
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, error_codes::INVALID_REQUEST, "Invalid Request")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INVALID_PARAMS, msg)
    }

    /// Map a broker failure to its error code.
    pub fn from_error(id: Option<Value>, err: &Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Registry(RegistryError::Validation(_)) => Self::invalid_params(id, message),
            Error::Registry(RegistryError::InitializationFailed { id: conn_id, name, .. }) => {
                Self::error(id, error_codes::INITIALIZATION_FAILED, message)
                    .with_data(json!({ "connectionId": conn_id, "name": name }))
            }
            Error::Broker(BrokerError::ConnectionNotActive(conn_id)) => {
                Self::error(id, error_codes::CONNECTION_NOT_ACTIVE, message)
                    .with_data(json!({ "connectionId": conn_id }))
            }
            Error::Broker(BrokerError::Client(_)) => {
                Self::error(id, error_codes::CLIENT_ERROR, message)
            }
            Error::Unsupported(_) => Self::error(id, error_codes::NOT_SUPPORTED, message),
            Error::NotFound(_) => Self::error(id, error_codes::CONNECTION_NOT_FOUND, message),
            Error::Json(_) => Self::error(id, error_codes::INTERNAL_ERROR, message),
        }
    }
}

// ============================================================================
// Procedure parameters
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddHttpParams {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddStdioParams {
    name: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionParams {
    connection_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallToolParams {
    connection_id: String,
    tool_name: String,
    #[serde(default)]
    params: Value,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, String> {
    let params = params.unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {e}"))
}

// ============================================================================
// Dispatch
// ============================================================================

/// Process a JSON-RPC request and return the response.
#[instrument(skip_all, fields(method = %request.method))]
pub async fn process_request(server: &BrokerServer, request: JsonRpcRequest) -> JsonRpcResponse {
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::invalid_request(request.id);
    }

    let JsonRpcRequest {
        id, method, params, ..
    } = request;

    let outcome = match method.as_str() {
        "connections/addHttp" => add_http(server, params).await,
        "connections/addStdio" => add_stdio(server, params).await,
        "connections/list" => list_connections(server).await,
        "connections/get" => get_connection(server, params).await,
        "connections/remove" => remove_connection(server, params).await,
        "tools/list" => list_tools(server, params).await,
        "tools/call" => call_tool(server, params).await,
        _ => {
            warn!("Unknown method: {}", method);
            return JsonRpcResponse::method_not_found(id);
        }
    };

    match outcome {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(Failure::Params(msg)) => JsonRpcResponse::invalid_params(id, msg),
        Err(Failure::Broker(err)) => JsonRpcResponse::from_error(id, &err),
    }
}

/// Why a procedure did not produce a result.
enum Failure {
    Params(String),
    Broker(Error),
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Self::Broker(err)
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Self::Broker(err.into())
    }
}

type Outcome = Result<Value, Failure>;

async fn add_http(server: &BrokerServer, params: Option<Value>) -> Outcome {
    let p: AddHttpParams = parse_params(params).map_err(Failure::Params)?;
    info!("Processing connections/addHttp for '{}'", p.name);

    let connection = server.add_http_connection(&p.name, &p.url).await?;
    Ok(serde_json::to_value(connection)?)
}

async fn add_stdio(server: &BrokerServer, params: Option<Value>) -> Outcome {
    let p: AddStdioParams = parse_params(params).map_err(Failure::Params)?;
    info!("Processing connections/addStdio for '{}'", p.name);

    let connection = server
        .add_stdio_connection(&p.name, &p.command, p.args, p.env)
        .await?;
    Ok(serde_json::to_value(connection)?)
}

async fn list_connections(server: &BrokerServer) -> Outcome {
    let connections = server.list_connections().await;
    Ok(json!({ "connections": connections }))
}

async fn get_connection(server: &BrokerServer, params: Option<Value>) -> Outcome {
    let p: IdParams = parse_params(params).map_err(Failure::Params)?;
    let connection = server.get_connection(&p.id).await?;
    Ok(serde_json::to_value(connection)?)
}

async fn remove_connection(server: &BrokerServer, params: Option<Value>) -> Outcome {
    let p: IdParams = parse_params(params).map_err(Failure::Params)?;
    let removed = server.remove_connection(&p.id).await;
    Ok(json!({ "removed": removed }))
}

async fn list_tools(server: &BrokerServer, params: Option<Value>) -> Outcome {
    let p: ConnectionParams = parse_params(params).map_err(Failure::Params)?;
    let tools = server.list_tools(&p.connection_id).await?;
    Ok(json!({ "tools": tools }))
}

async fn call_tool(server: &BrokerServer, params: Option<Value>) -> Outcome {
    let p: CallToolParams = parse_params(params).map_err(Failure::Params)?;
    Ok(server
        .call_tool(&p.connection_id, &p.tool_name, p.params)
        .await?)
}

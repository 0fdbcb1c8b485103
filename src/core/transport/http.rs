//! HTTP transport implementation.
//!
//! HTTP server with JSON-RPC over POST requests, so standard HTTP clients
//! (curl, browsers, application backends) can drive the broker.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use super::rpc::{JsonRpcRequest, JsonRpcResponse, process_request};
use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::BrokerServer;
use crate::core::security::verify_bearer;

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The broker instance.
    server: BrokerServer,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router serving the JSON-RPC, health and info endpoints.
    pub fn router(&self, server: BrokerServer) -> Router {
        let state = AppState { server };

        let mut app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc))
            .route("/health", get(health_check))
            .route("/", get(root_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        app
    }

    /// Run the HTTP transport until `shutdown` resolves.
    pub async fn run(
        self,
        server: BrokerServer,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        info!(
            "Ready - listening on {} (JSON-RPC over HTTP, CORS {})",
            addr, cors_status
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": state.server.name(),
        "version": state.server.version(),
        "transport": "HTTP",
        "protocol": "JSON-RPC 2.0",
        "methods": [
            "connections/addHttp",
            "connections/addStdio",
            "connections/list",
            "connections/get",
            "connections/remove",
            "tools/list",
            "tools/call"
        ]
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.server.registry();
    Json(serde_json::json!({
        "status": "healthy",
        "connections": registry.len().await,
        "active": registry.active_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle JSON-RPC requests.
///
/// The bearer token is checked before the body is decoded.
#[instrument(skip_all, fields(method))]
async fn handle_rpc(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let expected = state.server.config().credentials.access_token.as_deref();
    let presented = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if let Err(e) = verify_bearer(presented, expected) {
        warn!("Rejected JSON-RPC request: {}", e);
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    let request = match decode_request(&body) {
        Ok(request) => request,
        Err(response) => return (StatusCode::OK, Json(response)).into_response(),
    };
    tracing::Span::current().record("method", &request.method);

    info!("Received JSON-RPC request: {}", request.method);
    let response = process_request(&state.server, request).await;

    (StatusCode::OK, Json(response)).into_response()
}

fn decode_request(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Malformed JSON-RPC body: {}", e);
        JsonRpcResponse::parse_error(format!("Parse error: {e}"))
    })?;
    serde_json::from_value(value).map_err(|e| {
        warn!("Body is not a JSON-RPC request: {}", e);
        JsonRpcResponse::invalid_request(None)
    })
}

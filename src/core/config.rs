//! Configuration management for the MCP broker.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (a `.env` file is honoured) or
//! defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure for the MCP broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service identification and metadata.
    pub server: ServerConfig,

    /// Connection registry configuration.
    pub registry: RegistryConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Request surface (transport) configuration.
    pub transport: TransportConfig,

    /// Access control for the request surface.
    pub credentials: CredentialsConfig,
}

/// Service identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name reported by the root and health endpoints.
    pub name: String,

    /// The version of the service.
    pub version: String,
}

/// Configuration for the connection registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Whether stdio connections (which spawn a child process) may be created.
    pub allow_stdio: bool,

    /// Upper bound on a client's handshake, in seconds. `0` disables it.
    pub init_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Access control for the request surface.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Bearer token required on HTTP requests. No check when unset.
    pub access_token: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RegistryConfig {
    /// The handshake bound as a duration, if any.
    pub fn init_timeout(&self) -> Option<Duration> {
        (self.init_timeout_secs > 0).then(|| Duration::from_secs(self.init_timeout_secs))
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            allow_stdio: true,
            init_timeout_secs: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mcp-broker".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            registry: RegistryConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

/// Interpret a boolean environment value; anything but `false`/`0` is true.
pub(crate) fn parse_flag(value: &str) -> bool {
    value.to_lowercase() != "false" && value != "0"
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_ALLOW_STDIO`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::from_env();

        if let Ok(allow) = std::env::var("MCP_ALLOW_STDIO") {
            config.registry.allow_stdio = parse_flag(&allow);
        }
        if !config.registry.allow_stdio {
            info!("Stdio connections disabled: process spawning is not allowed");
        }

        if let Ok(timeout) = std::env::var("MCP_INIT_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => config.registry.init_timeout_secs = secs,
                Err(_) => warn!(
                    "Ignoring invalid MCP_INIT_TIMEOUT_SECS '{}', keeping {}s",
                    timeout, config.registry.init_timeout_secs
                ),
            }
        }

        match std::env::var("MCP_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => {
                config.credentials.access_token = Some(token);
                info!("Access token loaded from environment");
            }
            _ => warn!(
                "MCP_ACCESS_TOKEN not set - the HTTP surface accepts unauthenticated requests"
            ),
        }

        config
    }
}

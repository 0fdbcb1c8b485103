//! Connection records and the parameters used to create them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use super::error::RegistryError;

/// How a tool provider is reached.
///
/// Serialized with a `type` tag of `"http"` or `"stdio"`. The descriptive
/// names `"network"` and `"subprocess"` are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionTransport {
    /// A provider speaking MCP over streamable HTTP.
    #[serde(alias = "network")]
    Http { url: Url },

    /// A provider started as a child process speaking MCP over stdio.
    #[serde(alias = "subprocess")]
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
}

impl ConnectionTransport {
    /// Short tag used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Stdio { .. } => "stdio",
        }
    }

    /// Whether creating a client for this transport spawns a process.
    pub fn spawns_process(&self) -> bool {
        matches!(self, Self::Stdio { .. })
    }
}

/// A configured tool provider, as tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Registry-assigned identifier, never reused.
    pub id: String,

    /// Display label supplied by the caller.
    pub name: String,

    #[serde(flatten)]
    pub transport: ConnectionTransport,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - ID: {}", self.name, self.transport.kind(), self.id)
    }
}

/// Connection parameters submitted by a caller; everything but the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnection {
    pub name: String,

    #[serde(flatten)]
    pub transport: ConnectionTransport,
}

impl NewConnection {
    /// Build an HTTP connection request, parsing `url`.
    pub fn http(name: impl Into<String>, url: &str) -> Result<Self, RegistryError> {
        let url = Url::parse(url)
            .map_err(|e| RegistryError::validation(format!("invalid url '{url}': {e}")))?;

        Ok(Self {
            name: name.into(),
            transport: ConnectionTransport::Http { url },
        })
    }

    /// Build a stdio connection request.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: ConnectionTransport::Stdio {
                command: command.into(),
                args,
                env: BTreeMap::new(),
            },
        }
    }

    /// Add environment variables for a stdio provider. No effect on HTTP.
    pub fn with_env(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        if let ConnectionTransport::Stdio { env, .. } = &mut self.transport {
            env.extend(vars);
        }
        self
    }

    /// Check the request before any client is constructed for it.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::validation("name must not be empty"));
        }

        match &self.transport {
            ConnectionTransport::Http { url } => {
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(RegistryError::validation(format!(
                        "unsupported url scheme '{}', expected http or https",
                        url.scheme()
                    )));
                }
                if url.host_str().is_none() {
                    return Err(RegistryError::validation(format!("url '{url}' has no host")));
                }
            }
            ConnectionTransport::Stdio { command, .. } => {
                if command.trim().is_empty() {
                    return Err(RegistryError::validation("command must not be empty"));
                }
            }
        }

        Ok(())
    }

    /// Attach an identifier, producing the full record.
    pub fn into_connection(self, id: String) -> Connection {
        Connection {
            id,
            name: self.name,
            transport: self.transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_http_rejects_malformed_url() {
        let err = NewConnection::http("search", "not a url").unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let request = NewConnection::http("   ", "https://example.com/mcp").unwrap();
        assert_err!(request.validate());
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let request = NewConnection::http("files", "file:///tmp/mcp").unwrap();
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_validate_rejects_empty_command() {
        let request = NewConnection::stdio("local", "", vec![]);
        assert_err!(request.validate());
    }

    #[test]
    fn test_validate_accepts_well_formed_requests() {
        assert_ok!(NewConnection::http("search", "https://example.com/mcp").unwrap().validate());
        assert_ok!(NewConnection::stdio("git", "uvx", vec!["mcp-server-git".into()]).validate());
    }

    #[test]
    fn test_connection_serializes_with_type_tag() {
        let connection = NewConnection::http("search", "https://example.com/mcp")
            .unwrap()
            .into_connection("abc".to_string());
        let json = serde_json::to_value(&connection).unwrap();

        assert_eq!(json["id"], "abc");
        assert_eq!(json["name"], "search");
        assert_eq!(json["type"], "http");
        assert_eq!(json["url"], "https://example.com/mcp");
    }

    #[test]
    fn test_stdio_omits_empty_env() {
        let connection = NewConnection::stdio("git", "uvx", vec!["mcp-server-git".into()])
            .into_connection("id-1".to_string());
        let json = serde_json::to_value(&connection).unwrap();

        assert_eq!(json["type"], "stdio");
        assert_eq!(json["args"], serde_json::json!(["mcp-server-git"]));
        assert!(json.get("env").is_none());
    }

    #[test]
    fn test_deserialize_accepts_descriptive_aliases() {
        let json = serde_json::json!({
            "id": "x",
            "name": "local",
            "type": "subprocess",
            "command": "node",
        });
        let connection: Connection = serde_json::from_value(json).unwrap();
        assert!(connection.transport.spawns_process());
        assert_eq!(connection.transport.kind(), "stdio");
    }

    #[test]
    fn test_with_env_only_applies_to_stdio() {
        let vars = [("TOKEN".to_string(), "t".to_string())];
        let stdio = NewConnection::stdio("gh", "npx", vec![]).with_env(vars.clone());
        match stdio.transport {
            ConnectionTransport::Stdio { env, .. } => assert_eq!(env.get("TOKEN").unwrap(), "t"),
            _ => panic!("expected stdio transport"),
        }

        let http = NewConnection::http("web", "https://example.com").unwrap().with_env(vars);
        assert!(matches!(http.transport, ConnectionTransport::Http { .. }));
    }
}

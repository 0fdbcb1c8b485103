//! Domains module containing business logic organized by bounded contexts.
//!
//! - **protocol**: the client that talks MCP to one tool provider
//! - **connections**: the registry of configured providers and live clients
//! - **tools**: the broker forwarding tool discovery and invocation

pub mod connections;
pub mod protocol;
pub mod tools;

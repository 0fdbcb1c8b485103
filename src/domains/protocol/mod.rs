//! Protocol domain module.
//!
//! Everything needed to talk to a single tool provider: the client contract
//! the registry and broker depend on, the rmcp-backed implementation, and the
//! tool metadata type shared across the crate.
//!
//! ## Architecture
//!
//! - `client.rs` - `ProtocolClient` and `ClientFactory` traits
//! - `rmcp_client.rs` - rmcp implementation (streamable HTTP and child process)
//! - `types.rs` - `ToolDescriptor`
//! - `error.rs` - Client error types

mod client;
mod error;
mod rmcp_client;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{ClientFactory, ProtocolClient};
pub use error::ClientError;
pub use rmcp_client::{RmcpClient, RmcpClientFactory};
pub use types::ToolDescriptor;

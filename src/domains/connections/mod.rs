//! Connections domain module.
//!
//! Tracks which tool providers are configured and which of them currently
//! have an initialized protocol client.
//!
//! ## Architecture
//!
//! - `types.rs` - `Connection`, `NewConnection` and the transport variants
//! - `registry.rs` - `ConnectionRegistry`, the owner of both maps
//! - `error.rs` - Registry error types
//!
//! Configuration is held in memory only; it does not survive a restart.

mod error;
mod registry;
mod types;

pub use error::RegistryError;
pub use registry::ConnectionRegistry;
pub use types::{Connection, ConnectionTransport, NewConnection};

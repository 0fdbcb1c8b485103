//! Tools domain module.
//!
//! Forwards tool discovery and invocation to the live client of a
//! connection. The broker never touches registry state; it only looks up
//! clients through `ConnectionRegistry::live_client`.
//!
//! ## Architecture
//!
//! - `broker.rs` - `ToolBroker` lookup and delegation
//! - `error.rs` - Broker error types

mod broker;
mod error;

pub use broker::ToolBroker;
pub use error::BrokerError;

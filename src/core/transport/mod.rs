//! Request surface for the broker.
//!
//! This module provides different transport implementations:
//! - **STDIO**: line-delimited JSON-RPC on stdin/stdout - feature: `stdio`
//! - **HTTP**: JSON-RPC over POST requests - feature: `http`
//!
//! Both transports decode requests and hand them to [`rpc::process_request`],
//! which maps methods onto [`BrokerServer`](crate::core::BrokerServer)
//! procedures.

mod config;
mod error;
pub mod rpc;
mod service;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;

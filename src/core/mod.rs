//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the broker,
//! including error handling, configuration, the procedure surface in
//! [`BrokerServer`], and transport layer abstractions.

pub mod config;
pub mod error;
pub mod security;
pub mod server;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use server::BrokerServer;
pub use transport::{TransportConfig, TransportService};

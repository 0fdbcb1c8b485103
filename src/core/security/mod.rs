// Security module for request surface access control
//
// This module verifies that callers of the request surface present the
// configured access token before any connection is created or tool called.

pub mod access;

pub use access::{verify_bearer, AccessError};

//! Backend federation.
//!
//! Registered MCP backends are probed, their tools and resources are cached
//! and republished under `<server>.` and `<server>://` prefixes, and requests
//! are routed to them by name or from natural language. Only healthy backends
//! contribute to the aggregated catalog; failing ones keep their registration
//! and cache until they recover.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

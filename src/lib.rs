//! Switchboard: a federation gateway for Model Context Protocol servers.
//!
//! Switchboard registers independent MCP backends, keeps a namespaced catalog
//! of their tools and resources, tracks their health with a circuit breaker,
//! and forwards calls to the owning backend. Natural-language requests are
//! routed to a tool (or a multi-step workflow) by an optional reasoning
//! service, falling back to deterministic keyword matching.
//!
//! # Architecture
//!
//! The federation context follows hexagonal architecture principles:
//!
//! - **Domain**: validated names, endpoints, health state and catalogs
//! - **Ports**: the backend registry, backend client and reasoning contracts
//! - **Adapters**: in-memory registry, HTTP JSON-RPC client, chat-completions
//!   reasoner
//!
//! # Modules
//!
//! - [`federation`]: registry, aggregation, health, routing and dispatch
//! - [`protocol`]: JSON-RPC 2.0 and MCP wire types
//! - [`server`]: the axum HTTP surface
//! - [`config`]: environment configuration
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod federation;
pub mod protocol;
pub mod server;
pub mod telemetry;

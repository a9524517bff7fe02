//! JSON-RPC 2.0 envelopes and MCP message payloads.
//!
//! Shared by the backend client adapter and the gateway's own protocol
//! endpoint, so both sides agree on one wire representation.

mod jsonrpc;
mod mcp;

pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, error_codes};
pub use mcp::{
    CallToolParams, PROTOCOL_VERSION, ReadResourceParams, ResourceInfo, ResourcesListResult,
    ToolInfo, ToolsListResult,
};

/// JSON-RPC protocol version carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

//! Client port for the JSON-RPC surface of a backend server.

use crate::federation::domain::{BackendResource, BackendServer, BackendTool};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for backend calls.
pub type BackendCallResult<T> = Result<T, BackendCallError>;

/// Calls made by the gateway against one backend.
///
/// Implementations read the endpoint and credential from the supplied
/// snapshot. Timeouts are applied by callers.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Lists tools (`tools/list`).
    async fn list_tools(&self, server: &BackendServer) -> BackendCallResult<Vec<BackendTool>>;

    /// Lists resources (`resources/list`).
    async fn list_resources(
        &self,
        server: &BackendServer,
    ) -> BackendCallResult<Vec<BackendResource>>;

    /// Invokes a tool (`tools/call`) and returns the raw result object.
    async fn call_tool(
        &self,
        server: &BackendServer,
        tool: &str,
        arguments: Value,
    ) -> BackendCallResult<Value>;

    /// Reads a resource (`resources/read`) and returns the raw result object.
    async fn read_resource(&self, server: &BackendServer, uri: &str) -> BackendCallResult<Value>;
}

/// Errors returned by backend client implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendCallError {
    /// The request could not be delivered or the connection failed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No reply arrived within the allotted time.
    #[error("timed out after {after_ms} ms")]
    Timeout {
        /// Elapsed time limit in milliseconds.
        after_ms: u64,
    },

    /// The backend answered with a non-success HTTP status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The backend returned a JSON-RPC error object.
    #[error("JSON-RPC error {code}: {message}")]
    Protocol {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The reply was not a valid JSON-RPC response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendCallError {
    /// Returns whether a retry may succeed: transport failures, timeouts and
    /// 5xx statuses.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Protocol { .. } | Self::InvalidResponse(_) => false,
        }
    }
}

//! Service-level errors for federation operations.

use crate::federation::{
    domain::{FederationDomainError, HealthState, ServerName, StepId, StepReport},
    ports::{BackendCallError, RegistryError},
};
use crate::protocol::error_codes;
use thiserror::Error;

/// Result type for federation service operations.
pub type FederationResult<T> = Result<T, FederationError>;

/// Errors surfaced by the federation services.
#[derive(Debug, Clone, Error)]
pub enum FederationError {
    /// A registration named a malformed endpoint.
    #[error("invalid endpoint '{address}': {reason}")]
    InvalidEndpoint {
        /// Address as supplied.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Any other input validation failure.
    #[error(transparent)]
    InvalidRequest(FederationDomainError),

    /// No backend is registered under this name.
    #[error("unknown server: {0}")]
    UnknownServer(String),

    /// The tool is not in the owning backend's catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The resource is not in the owning backend's catalog.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// The backend is registered but currently excluded from routing.
    #[error("server {server} is not available (health: {health})")]
    ServerUnavailable {
        /// Backend name.
        server: ServerName,
        /// Current health state.
        health: HealthState,
    },

    /// The backend could not be reached after the local retry.
    #[error("backend {server} unreachable: {reason}")]
    BackendUnreachable {
        /// Backend name.
        server: ServerName,
        /// Transport failure description.
        reason: String,
    },

    /// The backend answered with an error.
    #[error("backend {server} returned error {code}: {message}")]
    BackendProtocolError {
        /// Backend name.
        server: ServerName,
        /// Error code reported by the backend.
        code: i64,
        /// Error message reported by the backend.
        message: String,
    },

    /// No tool in the healthy catalog matched the request.
    #[error("no tool matches the request with sufficient confidence: {request}")]
    RoutingLowConfidence {
        /// Request text.
        request: String,
    },

    /// A workflow stopped at a failing step.
    #[error("workflow step '{step_id}' failed after {} completed step(s): {source}", .completed.len())]
    WorkflowStepFailed {
        /// Failing step.
        step_id: StepId,
        /// Steps that completed before the failure.
        completed: Vec<StepReport>,
        /// Failure of the step.
        source: Box<FederationError>,
    },

    /// A step's argument template could not be resolved.
    #[error("cannot resolve arguments of step '{step_id}': {reason}")]
    TemplateResolution {
        /// Step whose template failed.
        step_id: StepId,
        /// Resolution failure.
        reason: String,
    },

    /// The registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<FederationDomainError> for FederationError {
    fn from(error: FederationDomainError) -> Self {
        match error {
            FederationDomainError::InvalidEndpoint { address, reason } => {
                Self::InvalidEndpoint { address, reason }
            }
            other => Self::InvalidRequest(other),
        }
    }
}

impl FederationError {
    /// Classifies a failed backend call.
    ///
    /// Transport failures, timeouts and 5xx statuses make the backend
    /// unreachable; anything else is an error reported by the backend.
    #[must_use]
    pub fn from_backend(server: &ServerName, error: BackendCallError) -> Self {
        match error {
            BackendCallError::Protocol { code, message } => Self::BackendProtocolError {
                server: server.clone(),
                code,
                message,
            },
            BackendCallError::InvalidResponse(message) => Self::BackendProtocolError {
                server: server.clone(),
                code: error_codes::PARSE_ERROR,
                message,
            },
            BackendCallError::Status { status, body } if status < 500 => {
                Self::BackendProtocolError {
                    server: server.clone(),
                    code: i64::from(status),
                    message: body,
                }
            }
            transient @ (BackendCallError::Transport(_)
            | BackendCallError::Timeout { .. }
            | BackendCallError::Status { .. }) => Self::BackendUnreachable {
                server: server.clone(),
                reason: transient.to_string(),
            },
        }
    }

    /// Returns the JSON-RPC error code reported on the protocol surface.
    #[must_use]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::InvalidEndpoint { .. }
            | Self::InvalidRequest(_)
            | Self::UnknownServer(_)
            | Self::UnknownTool(_)
            | Self::UnknownResource(_)
            | Self::RoutingLowConfidence { .. }
            | Self::TemplateResolution { .. } => error_codes::INVALID_PARAMS,
            Self::ServerUnavailable { .. } => error_codes::SERVER_UNAVAILABLE,
            Self::BackendUnreachable { .. } => error_codes::BACKEND_UNREACHABLE,
            Self::BackendProtocolError { .. } => error_codes::BACKEND_PROTOCOL_ERROR,
            Self::WorkflowStepFailed { source, .. } => source.rpc_code(),
            Self::Registry(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

//! Mapping of federation errors onto HTTP responses.

use crate::federation::services::FederationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result type for administration handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by the administration surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A federation operation failed.
    #[error(transparent)]
    Federation(#[from] FederationError),

    /// The request carried no valid API key.
    #[error("missing or invalid API key")]
    Unauthorized,
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Federation(error) => federation_status(error),
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Federation(error) => federation_kind(error),
            Self::Unauthorized => "unauthorized",
        }
    }
}

fn federation_status(error: &FederationError) -> StatusCode {
    match error {
        FederationError::InvalidEndpoint { .. } | FederationError::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        FederationError::UnknownServer(_)
        | FederationError::UnknownTool(_)
        | FederationError::UnknownResource(_) => StatusCode::NOT_FOUND,
        FederationError::RoutingLowConfidence { .. }
        | FederationError::TemplateResolution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FederationError::ServerUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        FederationError::BackendUnreachable { .. }
        | FederationError::BackendProtocolError { .. } => StatusCode::BAD_GATEWAY,
        FederationError::WorkflowStepFailed { source, .. } => federation_status(source),
        FederationError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn federation_kind(error: &FederationError) -> &'static str {
    match error {
        FederationError::InvalidEndpoint { .. } => "invalid_endpoint",
        FederationError::InvalidRequest(_) => "invalid_request",
        FederationError::UnknownServer(_) => "unknown_server",
        FederationError::UnknownTool(_) => "unknown_tool",
        FederationError::UnknownResource(_) => "unknown_resource",
        FederationError::ServerUnavailable { .. } => "server_unavailable",
        FederationError::BackendUnreachable { .. } => "backend_unreachable",
        FederationError::BackendProtocolError { .. } => "backend_protocol_error",
        FederationError::RoutingLowConfidence { .. } => "routing_low_confidence",
        FederationError::WorkflowStepFailed { .. } => "workflow_step_failed",
        FederationError::TemplateResolution { .. } => "template_resolution",
        FederationError::Registry(_) => "internal",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

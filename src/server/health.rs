//! Gateway liveness and information endpoints.

use super::AppState;
use crate::federation::ports::{BackendClient, BackendRegistry};
use axum::{Json, extract::State};
use mockable::Clock;
use serde::Serialize;
use serde_json::{Value, json};

const GATEWAY_NAME: &str = env!("CARGO_PKG_NAME");
const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: &'static str,
    /// Gateway name.
    pub name: &'static str,
    /// Gateway version.
    pub version: &'static str,
    /// Whether routing can use the reasoning backend.
    pub reasoning_enabled: bool,
}

/// `GET /health`
pub async fn health<R, B, C>(State(state): State<AppState<R, B, C>>) -> Json<HealthResponse>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Json(HealthResponse {
        status: "healthy",
        name: GATEWAY_NAME,
        version: GATEWAY_VERSION,
        reasoning_enabled: state.service.reasoning_enabled(),
    })
}

/// `GET /`
pub async fn info<R, B, C>(State(state): State<AppState<R, B, C>>) -> Json<Value>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    Json(json!({
        "name": GATEWAY_NAME,
        "version": GATEWAY_VERSION,
        "description": "MCP federation gateway",
        "reasoning_enabled": state.service.reasoning_enabled(),
        "endpoints": {
            "protocol": "/mcp",
            "servers": "/federation/servers",
            "tools": "/federation/tools",
            "resources": "/federation/resources",
            "route": "/federation/route",
            "stats": "/federation/stats",
            "health": "/health"
        }
    }))
}

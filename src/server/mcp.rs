//! The gateway's own MCP endpoint (`POST /mcp`).
//!
//! Tools and resources of healthy backends are listed and invoked under their
//! namespaced names. Federation errors are reported as JSON-RPC errors with
//! the failure kind's code and the message; the HTTP status stays 200.

use super::AppState;
use crate::federation::{
    ports::{BackendClient, BackendRegistry},
    services::{FederationError, FederationService},
};
use crate::protocol::{
    CallToolParams, JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    PROTOCOL_VERSION, ReadResourceParams, ResourceInfo, ResourcesListResult, ToolInfo,
    ToolsListResult, error_codes,
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mockable::Clock;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

/// Handles one JSON-RPC request. Notifications are acknowledged with
/// `202 Accepted` and no body.
pub async fn handle<R, B, C>(State(state): State<AppState<R, B, C>>, body: Bytes) -> Response
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    let document: Value = match serde_json::from_slice(&body) {
        Ok(document) => document,
        Err(err) => {
            return rpc_reply(JsonRpcResponse::failure(
                None,
                JsonRpcError::new(error_codes::PARSE_ERROR, format!("Parse error: {err}")),
            ));
        }
    };
    let request: JsonRpcRequest = match serde_json::from_value(document) {
        Ok(request) => request,
        Err(err) => {
            return rpc_reply(JsonRpcResponse::failure(
                None,
                JsonRpcError::new(error_codes::INVALID_REQUEST, format!("Invalid request: {err}")),
            ));
        }
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return rpc_reply(JsonRpcResponse::failure(
            request.id,
            JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ),
        ));
    }
    if request.is_notification() {
        debug!(method = %request.method, "notification received");
        return StatusCode::ACCEPTED.into_response();
    }

    let response = match dispatch(&state.service, &request.method, request.params).await {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(error) => JsonRpcResponse::failure(request.id, error),
    };
    rpc_reply(response)
}

fn rpc_reply(response: JsonRpcResponse) -> Response {
    Json(response).into_response()
}

async fn dispatch<R, B, C>(
    service: &FederationService<R, B, C>,
    method: &str,
    params: Option<Value>,
) -> Result<Value, JsonRpcError>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"listChanged": false},
                "resources": {"subscribe": false, "listChanged": false}
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => {
            let tools = service.list_tools().await.map_err(|err| rpc_error(&err))?;
            to_result(&ToolsListResult {
                tools: tools.iter().map(ToolInfo::from).collect(),
                next_cursor: None,
            })
        }
        "tools/call" => {
            let call: CallToolParams = parse_params(params)?;
            service
                .call_tool(&call.name, call.arguments)
                .await
                .map_err(|err| rpc_error(&err))
        }
        "resources/list" => {
            let resources = service.list_resources().await.map_err(|err| rpc_error(&err))?;
            to_result(&ResourcesListResult {
                resources: resources.iter().map(ResourceInfo::from).collect(),
                next_cursor: None,
            })
        }
        "resources/read" => {
            let read: ReadResourceParams = parse_params(params)?;
            service.read_resource(&read.uri).await.map_err(|err| rpc_error(&err))
        }
        other => Err(JsonRpcError::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(|err| {
        JsonRpcError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {err}"))
    })
}

fn to_result(payload: &impl Serialize) -> Result<Value, JsonRpcError> {
    serde_json::to_value(payload)
        .map_err(|err| JsonRpcError::new(error_codes::INTERNAL_ERROR, err.to_string()))
}

fn rpc_error(error: &FederationError) -> JsonRpcError {
    JsonRpcError::new(error.rpc_code(), error.to_string())
}

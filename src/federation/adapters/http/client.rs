//! JSON-RPC 2.0 over HTTP client for backend servers.

use super::body_excerpt;
use crate::federation::{
    domain::{BackendResource, BackendServer, BackendTool, Credential},
    ports::{BackendCallError, BackendCallResult, BackendClient},
};
use crate::protocol::{
    CallToolParams, JsonRpcRequest, JsonRpcResponse, ReadResourceParams, RequestId,
    ResourcesListResult, ToolsListResult,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Header carrying API-key credentials.
const API_KEY_HEADER: &str = "X-API-Key";

/// Backend client posting JSON-RPC envelopes to each backend's endpoint.
///
/// Replies may be plain JSON or a `text/event-stream` body whose last `data:`
/// event holds the JSON-RPC response.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    http: reqwest::Client,
    next_id: Arc<AtomicI64>,
}

impl HttpBackendClient {
    /// Creates a client over a shared connection pool.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    async fn call(
        &self,
        server: &BackendServer,
        method: &str,
        params: Value,
    ) -> BackendCallResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(RequestId::Number(id), method, Some(params));
        debug!(server = %server.name(), method, id, "calling backend");

        let builder = self
            .http
            .post(server.endpoint().as_str())
            .header(
                ACCEPT,
                HeaderValue::from_static("application/json, text/event-stream"),
            )
            .json(&request);
        let response = apply_credential(builder, server.credential())
            .send()
            .await
            .map_err(|err| BackendCallError::Transport(err.to_string()))?;

        let status = response.status();
        let is_event_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|err| BackendCallError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(BackendCallError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        let envelope = if is_event_stream {
            last_event_payload(&body).ok_or_else(|| {
                BackendCallError::InvalidResponse("event stream carried no data".to_owned())
            })?
        } else {
            body.as_str()
        };
        let reply: JsonRpcResponse = serde_json::from_str(envelope)
            .map_err(|err| BackendCallError::InvalidResponse(err.to_string()))?;

        reply
            .into_result()
            .map_err(|error| BackendCallError::Protocol {
                code: error.code,
                message: error.message,
            })
    }
}

fn apply_credential(
    builder: reqwest::RequestBuilder,
    credential: Option<&Credential>,
) -> reqwest::RequestBuilder {
    match credential {
        None => builder,
        Some(Credential::Bearer { token }) => builder.bearer_auth(token),
        Some(Credential::Basic { username, password }) => {
            builder.basic_auth(username, Some(password))
        }
        Some(Credential::ApiKey { key }) => builder.header(API_KEY_HEADER, key),
    }
}

fn last_event_payload(body: &str) -> Option<&str> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|payload| !payload.is_empty())
        .next_back()
}

fn decode<T: DeserializeOwned>(result: Value) -> BackendCallResult<T> {
    serde_json::from_value(result).map_err(|err| BackendCallError::InvalidResponse(err.to_string()))
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn list_tools(&self, server: &BackendServer) -> BackendCallResult<Vec<BackendTool>> {
        let listing: ToolsListResult = decode(self.call(server, "tools/list", json!({})).await?)?;
        listing
            .tools
            .into_iter()
            .map(|tool| {
                tool.into_backend_tool()
                    .map_err(|err| BackendCallError::InvalidResponse(err.to_string()))
            })
            .collect()
    }

    async fn list_resources(
        &self,
        server: &BackendServer,
    ) -> BackendCallResult<Vec<BackendResource>> {
        let listing: ResourcesListResult =
            decode(self.call(server, "resources/list", json!({})).await?)?;
        listing
            .resources
            .into_iter()
            .map(|resource| {
                resource
                    .into_backend_resource()
                    .map_err(|err| BackendCallError::InvalidResponse(err.to_string()))
            })
            .collect()
    }

    async fn call_tool(
        &self,
        server: &BackendServer,
        tool: &str,
        arguments: Value,
    ) -> BackendCallResult<Value> {
        let params = CallToolParams {
            name: tool.to_owned(),
            arguments,
        };
        let encoded = serde_json::to_value(params)
            .map_err(|err| BackendCallError::InvalidResponse(err.to_string()))?;
        self.call(server, "tools/call", encoded).await
    }

    async fn read_resource(&self, server: &BackendServer, uri: &str) -> BackendCallResult<Value> {
        let params = ReadResourceParams {
            uri: uri.to_owned(),
        };
        let encoded = serde_json::to_value(params)
            .map_err(|err| BackendCallError::InvalidResponse(err.to_string()))?;
        self.call(server, "resources/read", encoded).await
    }
}

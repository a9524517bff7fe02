//! Federation over real HTTP against a fake JSON-RPC backend.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
    routing::post,
};
use mockable::DefaultClock;
use rstest::rstest;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard::{
    federation::{
        adapters::{http::HttpBackendClient, memory::InMemoryBackendRegistry},
        domain::HealthState,
        services::{FederationError, FederationService, FederationSettings, RegisterServerRequest},
    },
    protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse},
};
use tokio::net::TcpListener;

type HttpService = FederationService<InMemoryBackendRegistry, HttpBackendClient, DefaultClock>;

/// Authorization headers seen by the fake backend.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<String>>>);

impl Seen {
    fn authorizations(&self) -> Vec<String> {
        self.0.lock().expect("lock").clone()
    }
}

fn answer(request: &JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();
    let params = request.params.clone().unwrap_or(Value::Null);
    match request.method.as_str() {
        "tools/list" => JsonRpcResponse::success(
            id,
            json!({"tools": [
                {"name": "echo", "description": "Echo text back", "inputSchema": {"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]}},
                {"name": "boom", "description": "Always fails", "inputSchema": {"type": "object"}}
            ]}),
        ),
        "tools/call" if params["name"] == "echo" => JsonRpcResponse::success(
            id,
            json!({"content": [{"type": "text", "text": params["arguments"]["text"]}], "isError": false}),
        ),
        "tools/call" => JsonRpcResponse::failure(id, JsonRpcError::new(-32000, "kaboom")),
        other => JsonRpcResponse::failure(
            id,
            JsonRpcError::new(-32601, format!("Method not found: {other}")),
        ),
    }
}

async fn json_backend(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        seen.0.lock().expect("lock").push(value.to_owned());
    }
    Json(answer(&request))
}

async fn event_stream_backend(Json(request): Json<JsonRpcRequest>) -> Response {
    let payload = serde_json::to_string(&answer(&request)).expect("serialise reply");
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        format!("event: message\ndata: {payload}\n\n"),
    )
        .into_response()
}

async fn spawn_backend() -> (SocketAddr, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/mcp", post(json_backend))
        .route("/sse", post(event_stream_backend))
        .with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend");
    });
    (addr, seen)
}

fn service() -> HttpService {
    FederationService::new(
        Arc::new(InMemoryBackendRegistry::new()),
        Arc::new(HttpBackendClient::new(reqwest::Client::new())),
        Arc::new(DefaultClock),
        None,
        FederationSettings {
            probe_timeout: Duration::from_secs(2),
            call_timeout: Duration::from_secs(2),
            retry_backoff: Duration::from_millis(10),
            ..FederationSettings::default()
        },
    )
}

fn registration(name: &str, url: String) -> RegisterServerRequest {
    RegisterServerRequest {
        name: name.to_owned(),
        url,
        auth_type: Some("bearer".to_owned()),
        auth_token: Some("t0ken".to_owned()),
        ..RegisterServerRequest::default()
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn registration_discovers_tools_with_credentials() {
    let (addr, seen) = spawn_backend().await;
    let gateway = service();

    let registered = gateway
        .register_server(registration("remote", format!("http://{addr}/mcp")))
        .await
        .expect("registration should succeed");

    assert_eq!(registered.server.health, HealthState::Healthy);
    assert_eq!(registered.server.tools_count, 2);
    assert_eq!(registered.server.resources_count, 0);
    let tools = gateway.list_tools().await.expect("tools should list");
    let names: Vec<&str> = tools.iter().map(|tool| tool.name()).collect();
    assert_eq!(names, vec!["remote.boom", "remote.echo"]);
    assert!(
        seen.authorizations()
            .iter()
            .all(|value| value == "Bearer t0ken")
    );
    assert!(!seen.authorizations().is_empty());
}

#[rstest]
#[case("/mcp")]
#[case("/sse")]
#[tokio::test(flavor = "multi_thread")]
async fn tool_call_round_trips(#[case] path: &str) {
    let (addr, _seen) = spawn_backend().await;
    let gateway = service();
    gateway
        .register_server(registration("remote", format!("http://{addr}{path}")))
        .await
        .expect("registration should succeed");

    let result = gateway
        .call_tool("remote.echo", json!({"text": "hi"}))
        .await
        .expect("call should succeed");

    assert_eq!(result["content"][0]["text"], json!("hi"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn backend_error_object_is_a_protocol_error() {
    let (addr, _seen) = spawn_backend().await;
    let gateway = service();
    gateway
        .register_server(registration("remote", format!("http://{addr}/mcp")))
        .await
        .expect("registration should succeed");

    let result = gateway.call_tool("remote.boom", json!({})).await;

    let Err(FederationError::BackendProtocolError { code, message, .. }) = result else {
        panic!("expected a backend protocol error");
    };
    assert_eq!(code, -32000);
    assert_eq!(message, "kaboom");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unreachable_backend_registers_without_tools() {
    let closed = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = closed.local_addr().expect("local addr");
    drop(closed);
    let gateway = service();

    let registered = gateway
        .register_server(registration("down", format!("http://{addr}/mcp")))
        .await
        .expect("registration is accepted even when the probe fails");

    assert_eq!(registered.server.health, HealthState::Unknown);
    assert_eq!(registered.server.consecutive_failures, 1);
    assert!(registered.server.last_error.is_some());
    assert!(gateway.list_tools().await.expect("tools").is_empty());
}

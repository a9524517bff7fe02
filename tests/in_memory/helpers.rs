//! Shared test helpers for in-memory federation integration tests.

use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use switchboard::federation::{
    adapters::memory::{InMemoryBackendClient, InMemoryBackendRegistry},
    domain::{BackendTool, HealthPolicy, ServerName},
    ports::ReasoningBackend,
    services::{FederationService, FederationSettings, RegisterServerRequest, RegisteredServer},
};

/// Service type used by the in-memory tests.
pub type TestService =
    FederationService<InMemoryBackendRegistry, InMemoryBackendClient, DefaultClock>;

/// Failure threshold used by [`gateway`].
pub const FAILURE_THRESHOLD: u32 = 2;

/// A federation service wired over scriptable in-memory backends.
pub struct Gateway {
    /// Scriptable backends.
    pub client: Arc<InMemoryBackendClient>,
    /// Service under test.
    pub service: TestService,
}

impl Gateway {
    /// Scripts a backend's tools and registers it.
    ///
    /// # Panics
    ///
    /// Panics when scripting or registration fails.
    pub async fn register(&self, name: &str, tools: Vec<BackendTool>) -> RegisteredServer {
        self.client
            .set_tools(&server(name), tools)
            .expect("tools should be scripted");
        self.service
            .register_server(registration(name))
            .await
            .expect("registration should succeed")
    }

    /// Marks a backend unreachable or reachable again.
    ///
    /// # Panics
    ///
    /// Panics when scripting fails.
    pub fn set_unreachable(&self, name: &str, unreachable: bool) {
        self.client
            .set_unreachable(&server(name), unreachable)
            .expect("reachability should be scripted");
    }

    /// Runs one on-demand probe of `name`.
    ///
    /// # Panics
    ///
    /// Panics when the probe cannot be recorded.
    pub async fn probe(&self, name: &str) {
        self.service
            .discover(Some(name))
            .await
            .expect("probe should be recorded");
    }

    /// Returns the namespaced names of every listed tool.
    ///
    /// # Panics
    ///
    /// Panics when listing fails.
    pub async fn tool_names(&self) -> Vec<String> {
        self.service
            .list_tools()
            .await
            .expect("tools should list")
            .iter()
            .map(|tool| tool.name().to_owned())
            .collect()
    }
}

/// Provides a gateway with a low failure threshold and no reasoning backend.
#[fixture]
pub fn gateway() -> Gateway {
    build_gateway(None)
}

/// Builds a gateway with a low failure threshold over `reasoner`.
pub fn build_gateway(reasoner: Option<Arc<dyn ReasoningBackend>>) -> Gateway {
    let client = Arc::new(InMemoryBackendClient::new());
    let service = FederationService::new(
        Arc::new(InMemoryBackendRegistry::new()),
        Arc::clone(&client),
        Arc::new(DefaultClock),
        reasoner,
        FederationSettings {
            health_policy: HealthPolicy::new(FAILURE_THRESHOLD),
            retry_backoff: Duration::from_millis(1),
            ..FederationSettings::default()
        },
    );
    Gateway { client, service }
}

/// Parses a server name.
///
/// # Panics
///
/// Panics when `name` is not a valid server name.
pub fn server(name: &str) -> ServerName {
    ServerName::new(name).expect("valid server name")
}

/// Builds a registration request for `name`.
pub fn registration(name: &str) -> RegisterServerRequest {
    RegisterServerRequest {
        name: name.to_owned(),
        url: format!("http://{name}.internal:8000/mcp"),
        description: format!("{name} backend"),
        ..RegisterServerRequest::default()
    }
}

/// Builds a tool whose schema declares `properties` as strings and requires
/// `required`.
///
/// # Panics
///
/// Panics when `name` is blank.
pub fn tool(
    name: &str,
    description: &str,
    properties: &[(&str, &str)],
    required: &[&str],
) -> BackendTool {
    let declared: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(property, kind)| ((*property).to_owned(), json!({"type": kind})))
        .collect();
    BackendTool::new(
        name,
        description,
        Some(json!({"type": "object", "properties": declared, "required": required})),
    )
    .expect("valid tool")
}

/// The mongo backend's tools.
pub fn mongo_tools() -> Vec<BackendTool> {
    vec![
        tool(
            "mongo_query",
            "Find documents in a collection",
            &[("collection", "string"), ("filter", "object")],
            &["collection"],
        ),
        tool(
            "mongo_insert",
            "Insert a document into a collection",
            &[("collection", "string"), ("document", "object")],
            &["collection", "document"],
        ),
    ]
}

/// The redis backend's tools.
pub fn redis_tools() -> Vec<BackendTool> {
    vec![
        tool(
            "redis_get",
            "Get a cached value by key",
            &[("key", "string")],
            &["key"],
        ),
        tool(
            "redis_set",
            "Store a value in the cache under a key",
            &[("key", "string"), ("value", "string"), ("ttl", "integer")],
            &["key", "value"],
        ),
    ]
}

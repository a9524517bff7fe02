//! Federation facade combining registry, aggregation, health, routing and
//! dispatch behind one service.

use super::{
    CapabilityAggregator, Dispatcher, FederationError, FederationResult, HealthMonitor,
    ProbeReport, Router,
};
use crate::federation::{
    domain::{
        AggregatedCatalog, BackendEndpoint, BackendServer, Credential, HealthPolicy, HealthState,
        QualifiedResourceUri, QualifiedToolName, ResourceDescriptor, Route, RoutingDecision,
        RoutingRequest, ServerName, ServerRegistration, StepFailure, ToolDescriptor, WorkflowPlan,
        WorkflowReport,
    },
    ports::{BackendClient, BackendRegistry, ReasoningBackend},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Timing and policy knobs for the federation services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FederationSettings {
    /// Circuit-breaker policy.
    pub health_policy: HealthPolicy,
    /// Interval between background probe rounds.
    pub probe_interval: Duration,
    /// Bound on one probe, including the catalog refresh.
    pub probe_timeout: Duration,
    /// Bound on one backend call.
    pub call_timeout: Duration,
    /// Pause before retrying a transient call failure.
    pub retry_backoff: Duration,
    /// Bound on one reasoning call.
    pub reasoning_timeout: Duration,
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            health_policy: HealthPolicy::default(),
            probe_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            retry_backoff: Duration::from_millis(250),
            reasoning_timeout: Duration::from_secs(15),
        }
    }
}

/// Registration payload accepted by the administration surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterServerRequest {
    /// Unique backend name.
    pub name: String,
    /// Backend endpoint URL.
    pub url: String,
    /// Human description.
    #[serde(default)]
    pub description: String,
    /// `bearer`, `basic` or `api_key`; absent for no authentication.
    #[serde(default)]
    pub auth_type: Option<String>,
    /// Secret for `auth_type`.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl RegisterServerRequest {
    fn credential(&self) -> Result<Option<Credential>, FederationError> {
        let Some(auth_type) = self
            .auth_type
            .as_deref()
            .map(str::trim)
            .filter(|kind| !kind.is_empty() && !kind.eq_ignore_ascii_case("none"))
        else {
            return Ok(None);
        };
        let token = self.auth_token.as_deref().unwrap_or_default();
        Ok(Some(Credential::parse(auth_type, token)?))
    }
}

/// Backend state as reported by the administration surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSummary {
    /// Backend name.
    pub name: ServerName,
    /// Endpoint URL.
    pub url: String,
    /// Human description.
    pub description: String,
    /// Configured auth type, if any.
    pub auth_type: Option<&'static str>,
    /// Health state.
    pub health: HealthState,
    /// Consecutive failed probes.
    pub consecutive_failures: u32,
    /// Time of the last probe.
    pub last_probe_at: Option<DateTime<Utc>>,
    /// Failure reason of the last probe, if it failed.
    pub last_error: Option<String>,
    /// Cached tool count.
    pub tools_count: usize,
    /// Cached resource count.
    pub resources_count: usize,
    /// Time the catalog was last refreshed.
    pub catalog_refreshed_at: Option<DateTime<Utc>>,
    /// Arbitrary metadata.
    pub metadata: BTreeMap<String, Value>,
    /// Position in registration order.
    pub registration_order: u64,
    /// First registration time.
    pub registered_at: DateTime<Utc>,
}

impl From<&BackendServer> for ServerSummary {
    fn from(server: &BackendServer) -> Self {
        Self {
            name: server.name().clone(),
            url: server.endpoint().to_string(),
            description: server.description().to_owned(),
            auth_type: server.credential().map(Credential::kind),
            health: server.health(),
            consecutive_failures: server.consecutive_failures(),
            last_probe_at: server.last_probe_at(),
            last_error: server.last_error().map(str::to_owned),
            tools_count: server.catalog().tools().len(),
            resources_count: server.catalog().resources().len(),
            catalog_refreshed_at: server.catalog_refreshed_at(),
            metadata: server.metadata().clone(),
            registration_order: server.registration_order(),
            registered_at: server.registered_at(),
        }
    }
}

/// One backend with its cached, namespaced capabilities.
///
/// Listed regardless of health, so operators can inspect what an excluded
/// backend would contribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerDetail {
    /// Backend state.
    #[serde(flatten)]
    pub summary: ServerSummary,
    /// Cached tools.
    pub tools: Vec<ToolDescriptor>,
    /// Cached resources.
    pub resources: Vec<ResourceDescriptor>,
}

/// Result of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredServer {
    /// Whether the name was new.
    pub created: bool,
    /// Backend state after the initial probe.
    pub server: ServerSummary,
}

/// Result of a natural-language routing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteOutcome {
    /// One backend call and its result.
    Call {
        /// The decision that was executed.
        routing: RoutingDecision,
        /// Raw tool result.
        result: Value,
    },
    /// A workflow and its execution report.
    Workflow {
        /// The plan that was executed.
        routing: WorkflowPlan,
        /// Completed steps and the failing step, if any.
        workflow: WorkflowReport,
    },
}

/// Aggregate counts for the administration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FederationStats {
    /// Registered backends.
    pub total_servers: usize,
    /// Backends currently routable.
    pub healthy_servers: usize,
    /// Backends excluded by the circuit breaker.
    pub unhealthy_servers: usize,
    /// Backends not yet probed successfully.
    pub unknown_servers: usize,
    /// Tools in the aggregated catalog.
    pub total_tools: usize,
    /// Resources in the aggregated catalog.
    pub total_resources: usize,
    /// Whether routing can use the reasoning backend.
    pub reasoning_enabled: bool,
}

/// Single entry point for the protocol and administration surfaces.
pub struct FederationService<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    aggregator: CapabilityAggregator<R, B, C>,
    monitor: Arc<HealthMonitor<R, B, C>>,
    router: Router,
    dispatcher: Dispatcher<R, B>,
    clock: Arc<C>,
}

impl<R, B, C> FederationService<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    /// Wires the federation services over shared adapters.
    #[must_use]
    pub fn new(
        registry: Arc<R>,
        client: Arc<B>,
        clock: Arc<C>,
        reasoner: Option<Arc<dyn ReasoningBackend>>,
        settings: FederationSettings,
    ) -> Self {
        let aggregator = CapabilityAggregator::new(
            Arc::clone(&registry),
            Arc::clone(&client),
            Arc::clone(&clock),
            settings.probe_timeout,
        );
        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&registry),
            CapabilityAggregator::new(
                Arc::clone(&registry),
                Arc::clone(&client),
                Arc::clone(&clock),
                settings.probe_timeout,
            ),
            Arc::clone(&clock),
            settings.health_policy,
            settings.probe_interval,
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            client,
            settings.call_timeout,
            settings.retry_backoff,
        );
        Self {
            registry,
            aggregator,
            monitor,
            router: Router::new(reasoner, settings.reasoning_timeout),
            dispatcher,
            clock,
        }
    }

    /// Returns the health monitor, for spawning its background loop.
    #[must_use]
    pub fn monitor(&self) -> Arc<HealthMonitor<R, B, C>> {
        Arc::clone(&self.monitor)
    }

    /// Returns whether routing can use the reasoning backend.
    #[must_use]
    pub const fn reasoning_enabled(&self) -> bool {
        self.router.reasoning_enabled()
    }

    /// Registers or updates a backend and probes it once.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::InvalidEndpoint`] for a malformed URL,
    /// [`FederationError::InvalidRequest`] for a malformed name or
    /// credential, and [`FederationError::Registry`] when the registry fails.
    /// A failing initial probe is not an error.
    pub async fn register_server(
        &self,
        request: RegisterServerRequest,
    ) -> FederationResult<RegisteredServer> {
        let name = ServerName::new(request.name.as_str())?;
        let endpoint = BackendEndpoint::new(request.url.as_str())?;
        let credential = request.credential()?;
        let registration = ServerRegistration::new(name.clone(), endpoint)
            .with_credential(credential)
            .with_description(request.description)
            .with_metadata(request.metadata);

        let outcome = self.registry.upsert(registration, self.clock.utc()).await?;
        info!(
            server = %name,
            created = outcome.created,
            target_changed = outcome.target_changed,
            "backend registered"
        );

        if let Err(err) = self.monitor.probe(&name).await {
            warn!(server = %name, error = %err, "initial probe could not be recorded");
        }
        let current = self.registry.find(&name).await?.unwrap_or(outcome.server);
        Ok(RegisteredServer {
            created: outcome.created,
            server: ServerSummary::from(&current),
        })
    }

    /// Removes a backend. Returns whether it was registered.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::InvalidRequest`] for a malformed name and
    /// [`FederationError::Registry`] when the registry fails.
    pub async fn unregister_server(&self, name: &str) -> FederationResult<bool> {
        let server_name = ServerName::new(name)?;
        let removed = self.registry.remove(&server_name).await?.is_some();
        if removed {
            info!(server = %server_name, "backend unregistered");
        }
        Ok(removed)
    }

    /// Lists every backend in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Registry`] when the registry fails.
    pub async fn list_servers(&self) -> FederationResult<Vec<ServerSummary>> {
        let servers = self.registry.list().await?;
        Ok(servers.iter().map(ServerSummary::from).collect())
    }

    /// Returns one backend with its cached capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::UnknownServer`] when no backend has this
    /// name.
    pub async fn server_detail(&self, name: &str) -> FederationResult<ServerDetail> {
        let server = self.find_server(name).await?;
        Ok(ServerDetail {
            summary: ServerSummary::from(&server),
            tools: server
                .catalog()
                .tools()
                .iter()
                .map(|tool| ToolDescriptor::namespaced(server.name(), tool))
                .collect(),
            resources: server
                .catalog()
                .resources()
                .iter()
                .map(|resource| ResourceDescriptor::namespaced(server.name(), resource))
                .collect(),
        })
    }

    /// Probes one backend, or every backend when `name` is `None`,
    /// refreshing catalogs on success.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::UnknownServer`] for an unknown name.
    pub async fn discover(&self, name: Option<&str>) -> FederationResult<Vec<ProbeReport>> {
        match name {
            Some(requested) => {
                let server = self.find_server(requested).await?;
                Ok(vec![self.monitor.probe(server.name()).await?])
            }
            None => self.monitor.probe_all().await,
        }
    }

    /// Returns the aggregated catalog of healthy backends.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Registry`] when the registry fails.
    pub async fn catalog(&self) -> FederationResult<AggregatedCatalog> {
        self.aggregator.aggregate().await
    }

    /// Lists the namespaced tools of healthy backends.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Registry`] when the registry fails.
    pub async fn list_tools(&self) -> FederationResult<Vec<ToolDescriptor>> {
        Ok(self.catalog().await?.tools().to_vec())
    }

    /// Lists the namespaced resources of healthy backends.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Registry`] when the registry fails.
    pub async fn list_resources(&self) -> FederationResult<Vec<ResourceDescriptor>> {
        Ok(self.catalog().await?.resources().to_vec())
    }

    /// Calls a tool by namespaced name.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::UnknownTool`] for a name without a server
    /// prefix, otherwise the errors of [`Dispatcher::call_tool`].
    pub async fn call_tool(&self, name: &str, arguments: Value) -> FederationResult<Value> {
        let tool = QualifiedToolName::parse(name)
            .map_err(|_| FederationError::UnknownTool(name.to_owned()))?;
        self.dispatcher.call_tool(&tool, arguments).await
    }

    /// Reads a resource by namespaced URI.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::UnknownResource`] for a URI without a server
    /// prefix, otherwise the errors of [`Dispatcher::read_resource`].
    pub async fn read_resource(&self, uri: &str) -> FederationResult<Value> {
        let resource = QualifiedResourceUri::parse(uri)
            .map_err(|_| FederationError::UnknownResource(uri.to_owned()))?;
        self.dispatcher.read_resource(&resource).await
    }

    /// Routes a natural-language request and executes the result.
    ///
    /// A workflow that stops at a failing step is reported, not returned as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::InvalidRequest`] for blank text,
    /// [`FederationError::RoutingLowConfidence`] when nothing matches, and
    /// dispatch errors of a single call.
    pub async fn route(
        &self,
        text: &str,
        context: Option<Value>,
    ) -> FederationResult<RouteOutcome> {
        let request = RoutingRequest::new(text, context)?;
        let catalog = self.catalog().await?;

        match self.router.route(&request, &catalog).await? {
            Route::Single(decision) => {
                let result = self.dispatcher.execute(&decision).await?;
                Ok(RouteOutcome::Call {
                    routing: decision,
                    result,
                })
            }
            Route::Workflow(plan) => {
                let workflow = match self.dispatcher.execute_workflow(&plan).await {
                    Ok(report) => report,
                    Err(FederationError::WorkflowStepFailed {
                        step_id,
                        completed,
                        source,
                    }) => {
                        let failed_step = plan.steps().iter().find(|step| step.id == step_id);
                        WorkflowReport {
                            completed,
                            failure: failed_step.map(|step| StepFailure {
                                id: step.id.clone(),
                                server: step.server.clone(),
                                tool: step.tool.clone(),
                                error: source.to_string(),
                            }),
                        }
                    }
                    Err(other) => return Err(other),
                };
                Ok(RouteOutcome::Workflow {
                    routing: plan,
                    workflow,
                })
            }
        }
    }

    /// Returns aggregate counts.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Registry`] when the registry fails.
    pub async fn stats(&self) -> FederationResult<FederationStats> {
        let servers = self.registry.list().await?;
        let catalog = AggregatedCatalog::from_servers(&servers);
        let count = |state: HealthState| {
            servers
                .iter()
                .filter(|server| server.health() == state)
                .count()
        };
        Ok(FederationStats {
            total_servers: servers.len(),
            healthy_servers: count(HealthState::Healthy),
            unhealthy_servers: count(HealthState::Unhealthy),
            unknown_servers: count(HealthState::Unknown),
            total_tools: catalog.tools().len(),
            total_resources: catalog.resources().len(),
            reasoning_enabled: self.reasoning_enabled(),
        })
    }

    async fn find_server(&self, name: &str) -> FederationResult<BackendServer> {
        let unknown = || FederationError::UnknownServer(name.to_owned());
        let server_name = ServerName::new(name).map_err(|_| unknown())?;
        self.registry.find(&server_name).await?.ok_or_else(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::{
        adapters::memory::{InMemoryBackendClient, InMemoryBackendRegistry},
        domain::{BackendTool, RoutingStrategy},
        ports::MockReasoningBackend,
    };
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};
    use serde_json::json;

    type Service = FederationService<InMemoryBackendRegistry, InMemoryBackendClient, DefaultClock>;

    struct Harness {
        client: Arc<InMemoryBackendClient>,
        service: Service,
    }

    impl Harness {
        fn script(&self, name: &str, tools: &[&str]) {
            let server_name = ServerName::new(name).expect("valid server name");
            self.client
                .set_tools(
                    &server_name,
                    tools
                        .iter()
                        .map(|tool| {
                            BackendTool::new(
                                *tool,
                                format!("{tool} operation"),
                                Some(json!({"type": "object", "properties": {"key": {"type": "string"}}})),
                            )
                            .expect("valid tool")
                        })
                        .collect(),
                )
                .expect("script");
        }

        async fn register(&self, name: &str, tools: &[&str]) -> RegisteredServer {
            self.script(name, tools);
            self.service
                .register_server(request(name))
                .await
                .expect("registration should succeed")
        }
    }

    fn request(name: &str) -> RegisterServerRequest {
        RegisterServerRequest {
            name: name.to_owned(),
            url: format!("http://{name}.internal:8080/mcp"),
            ..RegisterServerRequest::default()
        }
    }

    fn build(reasoner: Option<Arc<dyn ReasoningBackend>>) -> Harness {
        let client = Arc::new(InMemoryBackendClient::new());
        let service = FederationService::new(
            Arc::new(InMemoryBackendRegistry::new()),
            Arc::clone(&client),
            Arc::new(DefaultClock),
            reasoner,
            FederationSettings {
                retry_backoff: Duration::from_millis(1),
                ..FederationSettings::default()
            },
        );
        Harness { client, service }
    }

    #[fixture]
    fn harness() -> Harness {
        build(None)
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn registration_probes_and_aggregates(harness: Harness) {
        let registered = harness.register("mongo", &["mongo_query"]).await;
        harness.register("redis", &["redis_get", "redis_set"]).await;

        assert!(registered.created);
        assert_eq!(registered.server.health, HealthState::Healthy);
        let tools = harness.service.list_tools().await.expect("list tools");
        let names: Vec<&str> = tools.iter().map(ToolDescriptor::name).collect();
        assert_eq!(
            names,
            vec!["mongo.mongo_query", "redis.redis_get", "redis.redis_set"]
        );
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn re_registration_updates_in_place(harness: Harness) {
        harness.register("mongo", &["mongo_query"]).await;
        let mut update = request("mongo");
        update.metadata.insert("region".to_owned(), json!("eu"));

        let outcome = harness
            .service
            .register_server(update)
            .await
            .expect("update should succeed");

        assert!(!outcome.created);
        let servers = harness.service.list_servers().await.expect("list");
        assert_eq!(servers.len(), 1);
        assert_eq!(
            servers.first().and_then(|server| server.metadata.get("region")),
            Some(&json!("eu"))
        );
    }

    #[rstest]
    #[case::bad_scheme("ftp://mongo:21")]
    #[case::no_host("http://")]
    #[case::spaces("http://mon go:1")]
    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_url_is_invalid_endpoint(harness: Harness, #[case] url: &str) {
        let result = harness
            .service
            .register_server(RegisterServerRequest {
                url: url.to_owned(),
                ..request("mongo")
            })
            .await;

        assert!(matches!(result, Err(FederationError::InvalidEndpoint { .. })));
        assert!(harness.service.list_servers().await.expect("list").is_empty());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unregister_is_idempotent_and_hides_tools(harness: Harness) {
        harness.register("mongo", &["mongo_query"]).await;

        assert!(harness.service.unregister_server("mongo").await.expect("remove"));
        assert!(!harness.service.unregister_server("mongo").await.expect("remove"));
        assert!(harness.service.list_tools().await.expect("tools").is_empty());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_backend_registers_without_tools(harness: Harness) {
        let registered = harness
            .service
            .register_server(request("ghost"))
            .await
            .expect("registration should succeed");

        assert_eq!(registered.server.health, HealthState::Unknown);
        assert_eq!(registered.server.consecutive_failures, 1);
        assert!(registered.server.last_error.is_some());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn namespaced_call_is_dispatched(harness: Harness) {
        harness.register("redis", &["redis_get"]).await;

        let result = harness
            .service
            .call_tool("redis.redis_get", json!({"key": "foo"}))
            .await
            .expect("call should succeed");

        assert_eq!(result.get("structuredContent"), Some(&json!({"key": "foo"})));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unprefixed_tool_name_is_unknown(harness: Harness) {
        let result = harness.service.call_tool("redis_get", json!({})).await;
        assert!(matches!(result, Err(FederationError::UnknownTool(_))));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn route_falls_back_and_executes(harness: Harness) {
        harness.register("mongo", &["mongo_query"]).await;
        harness.register("redis", &["redis_get", "redis_set"]).await;

        let outcome = harness
            .service
            .route("get value from redis cache key foo", None)
            .await
            .expect("route should succeed");

        let RouteOutcome::Call { routing, result } = outcome else {
            panic!("expected a single call");
        };
        assert_eq!(routing.qualified_tool().to_string(), "redis.redis_get");
        assert_eq!(routing.strategy, RoutingStrategy::Fallback);
        assert_eq!(result.get("structuredContent"), Some(&json!({"key": "foo"})));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_workflow_step_is_reported() {
        let mut mock = MockReasoningBackend::new();
        mock.expect_complete().returning(|_| {
            Ok(json!({
                "multi_step": true,
                "steps": [
                    {"id": "create_user", "server": "auth", "tool": "create_user", "arguments": {"key": "ada"}},
                    {"id": "init", "server": "profile", "tool": "init_profile", "arguments": {"key": "{{ steps.create_user.user_id }}"}}
                ],
                "reasoning": "create then initialise",
                "confidence": 0.9
            }))
        });
        let harness = build(Some(Arc::new(mock)));
        harness.register("auth", &["create_user"]).await;
        harness.register("profile", &["init_profile"]).await;
        let auth = ServerName::new("auth").expect("valid server name");
        harness
            .client
            .push_result(
                &auth,
                "create_user",
                Err(crate::federation::ports::BackendCallError::Protocol {
                    code: -32000,
                    message: "user exists".to_owned(),
                }),
            )
            .expect("script");

        let outcome = harness
            .service
            .route("create user ada and initialise her profile", None)
            .await
            .expect("route should succeed");

        let RouteOutcome::Workflow { workflow, .. } = outcome else {
            panic!("expected a workflow");
        };
        assert!(workflow.completed.is_empty());
        let failure = workflow.failure.expect("failure should be reported");
        assert_eq!(failure.id.as_str(), "create_user");
        assert!(failure.error.contains("user exists"));
        let calls = harness.client.calls().expect("calls");
        assert_eq!(calls.len(), 1);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn stats_count_health_states(harness: Harness) {
        harness.register("mongo", &["mongo_query"]).await;
        harness
            .service
            .register_server(request("ghost"))
            .await
            .expect("registration");

        let stats = harness.service.stats().await.expect("stats");

        assert_eq!(stats.total_servers, 2);
        assert_eq!(stats.healthy_servers, 1);
        assert_eq!(stats.unknown_servers, 1);
        assert_eq!(stats.total_tools, 1);
        assert!(!stats.reasoning_enabled);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn server_detail_lists_cached_tools(harness: Harness) {
        harness.register("redis", &["redis_get"]).await;

        let detail = harness.service.server_detail("redis").await.expect("detail");
        assert_eq!(detail.summary.tools_count, 1);
        assert_eq!(
            detail.tools.first().map(ToolDescriptor::name),
            Some("redis.redis_get")
        );
        assert!(matches!(
            harness.service.server_detail("Not A Name!").await,
            Err(FederationError::UnknownServer(_))
        ));
    }
}

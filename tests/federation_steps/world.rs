//! Shared world state for federation BDD scenarios.

use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use std::time::Duration;
use switchboard::federation::{
    adapters::memory::{InMemoryBackendClient, InMemoryBackendRegistry},
    domain::{BackendTool, HealthPolicy, ServerName},
    services::{
        FederationResult, FederationService, FederationSettings, RegisterServerRequest,
        RouteOutcome,
    },
};

/// Service type used by the BDD world.
pub type TestFederationService =
    FederationService<InMemoryBackendRegistry, InMemoryBackendClient, DefaultClock>;

/// Backend waiting to be registered.
pub struct PendingBackend {
    /// Backend name.
    pub name: String,
    /// Tool names the backend offers.
    pub tools: Vec<String>,
}

/// Scenario world for federation behaviour tests.
pub struct FederationWorld {
    /// Scriptable backends.
    pub client: Arc<InMemoryBackendClient>,
    /// The federation service under test.
    pub service: TestFederationService,
    /// Backends queued for registration.
    pub pending_backends: Vec<PendingBackend>,
    /// Result of the last routed request.
    pub last_route: Option<FederationResult<RouteOutcome>>,
}

impl FederationWorld {
    /// Creates a world whose circuit breaker trips after two failures.
    #[must_use]
    pub fn new() -> Self {
        let client = Arc::new(InMemoryBackendClient::new());
        let service = FederationService::new(
            Arc::new(InMemoryBackendRegistry::new()),
            Arc::clone(&client),
            Arc::new(DefaultClock),
            None,
            FederationSettings {
                health_policy: HealthPolicy::new(2),
                retry_backoff: Duration::from_millis(1),
                ..FederationSettings::default()
            },
        );
        Self {
            client,
            service,
            pending_backends: Vec::new(),
            last_route: None,
        }
    }

    /// Scripts and registers a backend.
    ///
    /// # Errors
    ///
    /// Returns an error when scripting or registration fails.
    pub fn register(&self, backend: &PendingBackend) -> Result<(), eyre::Report> {
        let name = server_name(&backend.name)?;
        let tools = backend
            .tools
            .iter()
            .map(|tool| BackendTool::new(tool.as_str(), format!("{tool} operation"), None))
            .collect::<Result<Vec<_>, _>>()?;
        self.client.set_tools(&name, tools)?;
        run_async(self.service.register_server(RegisterServerRequest {
            name: backend.name.clone(),
            url: format!("http://{}.internal:8000/mcp", backend.name),
            ..RegisterServerRequest::default()
        }))?;
        Ok(())
    }
}

impl Default for FederationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> FederationWorld {
    FederationWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Parses a server name.
///
/// # Errors
///
/// Returns an error when `name` is not a valid server name.
pub fn server_name(name: &str) -> Result<ServerName, eyre::Report> {
    Ok(ServerName::new(name)?)
}

/// Splits a comma-separated list.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

//! Capability aggregation across registered backends.

use super::FederationResult;
use crate::federation::{
    domain::{AggregatedCatalog, BackendCatalog, BackendServer},
    ports::{BackendCallError, BackendCallResult, BackendClient, BackendRegistry},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Fetches backend catalogs into the registry cache and derives the
/// aggregated, namespaced catalog on read.
#[derive(Clone)]
pub struct CapabilityAggregator<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    client: Arc<B>,
    clock: Arc<C>,
    fetch_timeout: Duration,
}

impl<R, B, C> CapabilityAggregator<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    /// Creates an aggregator whose fetches are bounded by `fetch_timeout`.
    #[must_use]
    pub const fn new(
        registry: Arc<R>,
        client: Arc<B>,
        clock: Arc<C>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            clock,
            fetch_timeout,
        }
    }

    /// Fetches a backend's tools and resources and replaces its cached
    /// catalog.
    ///
    /// A protocol error from `resources/list` means the backend has no
    /// resources. Any other failure leaves the previous cache untouched, and
    /// so does a fetch whose entry was re-registered with a new target while
    /// it ran.
    ///
    /// # Errors
    ///
    /// Returns the [`BackendCallError`] of the failed fetch, including
    /// [`BackendCallError::Timeout`] when the fetch exceeds its bound. A
    /// registry failure while storing the catalog is reported as a transport
    /// failure so that it is never mistaken for a healthy probe.
    #[instrument(skip(self, server), fields(server = %server.name()))]
    pub async fn refresh(&self, server: &BackendServer) -> BackendCallResult<BackendCatalog> {
        let catalog = tokio::time::timeout(self.fetch_timeout, self.fetch(server))
            .await
            .map_err(|_| BackendCallError::Timeout {
                after_ms: millis(self.fetch_timeout),
            })??;

        self.registry
            .replace_catalog(
                server.name(),
                server.generation(),
                catalog.clone(),
                self.clock.utc(),
            )
            .await
            .map_err(|err| BackendCallError::Transport(err.to_string()))?;
        debug!(
            tools = catalog.tools().len(),
            resources = catalog.resources().len(),
            "catalog refreshed"
        );
        Ok(catalog)
    }

    async fn fetch(&self, server: &BackendServer) -> BackendCallResult<BackendCatalog> {
        let tools = self.client.list_tools(server).await?;
        let resources = match self.client.list_resources(server).await {
            Ok(resources) => resources,
            Err(BackendCallError::Protocol { .. }) => Vec::new(),
            Err(other) => return Err(other),
        };
        Ok(BackendCatalog::new(tools, resources))
    }

    /// Returns the namespaced catalog of every healthy backend.
    ///
    /// # Errors
    ///
    /// Returns [`super::FederationError::Registry`] when the registry fails.
    pub async fn aggregate(&self) -> FederationResult<AggregatedCatalog> {
        let healthy = self.registry.list_healthy().await?;
        Ok(AggregatedCatalog::from_servers(&healthy))
    }
}

/// Converts a duration to whole milliseconds, saturating.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

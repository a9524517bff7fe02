//! Background health probing and the circuit-breaker loop.

use super::{CapabilityAggregator, FederationError, FederationResult};
use crate::federation::{
    domain::{
        BackendServer, HealthPolicy, HealthState, HealthTransition, ProbeOutcome, ServerName,
    },
    ports::{BackendClient, BackendRegistry, RegistryError},
};
use futures::future::join_all;
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Outcome of probing one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// Probed backend.
    pub server: ServerName,
    /// Health after the probe was applied.
    pub health: HealthState,
    /// Failure reason when the probe failed.
    pub error: Option<String>,
    /// Number of cached tools after the probe.
    pub tools_count: usize,
    /// State change caused by the probe, if any.
    pub transition: Option<HealthTransition>,
}

/// Probes backends and feeds results into the registry's health state
/// machine.
///
/// A probe is a bounded catalog refresh: success refreshes the cache and
/// counts as a healthy probe, any failure (including a timeout) counts
/// against the backend and leaves its cache intact.
pub struct HealthMonitor<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    registry: Arc<R>,
    aggregator: CapabilityAggregator<R, B, C>,
    clock: Arc<C>,
    policy: HealthPolicy,
    interval: Duration,
}

impl<R, B, C> HealthMonitor<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    /// Creates a monitor probing every `interval` under `policy`.
    #[must_use]
    pub const fn new(
        registry: Arc<R>,
        aggregator: CapabilityAggregator<R, B, C>,
        clock: Arc<C>,
        policy: HealthPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            aggregator,
            clock,
            policy,
            interval,
        }
    }

    /// Returns the circuit-breaker policy.
    #[must_use]
    pub const fn policy(&self) -> HealthPolicy {
        self.policy
    }

    /// Probes one backend by name.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::UnknownServer`] when the backend is not
    /// registered and [`FederationError::Registry`] when the registry fails.
    /// Probe failures are not errors; they are reported in the result.
    pub async fn probe(&self, name: &ServerName) -> FederationResult<ProbeReport> {
        let server = self
            .registry
            .find(name)
            .await?
            .ok_or_else(|| FederationError::UnknownServer(name.to_string()))?;
        self.probe_server(&server).await
    }

    /// Probes every registered backend concurrently.
    ///
    /// Backends removed while their probe was in flight are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::Registry`] when the registry cannot be
    /// listed.
    pub async fn probe_all(&self) -> FederationResult<Vec<ProbeReport>> {
        let servers = self.registry.list().await?;
        let results = join_all(servers.iter().map(|server| self.probe_server(server))).await;

        let mut reports = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(FederationError::UnknownServer(name)) => {
                    debug!(server = %name, "backend removed during probe");
                }
                Err(other) => warn!(error = %other, "probe result could not be recorded"),
            }
        }
        Ok(reports)
    }

    #[instrument(skip(self, server), fields(server = %server.name()))]
    async fn probe_server(&self, server: &BackendServer) -> FederationResult<ProbeReport> {
        let (outcome, tools_count) = match self.aggregator.refresh(server).await {
            Ok(catalog) => (ProbeOutcome::Success, catalog.tools().len()),
            Err(err) => {
                warn!(error = %err, "backend probe failed");
                (
                    ProbeOutcome::failure(err.to_string()),
                    server.catalog().tools().len(),
                )
            }
        };
        let error = match &outcome {
            ProbeOutcome::Success => None,
            ProbeOutcome::Failure { reason } => Some(reason.clone()),
        };

        let recorded = self
            .registry
            .record_probe(
                server.name(),
                server.generation(),
                outcome,
                self.policy,
                self.clock.utc(),
            )
            .await;
        let transition = match recorded {
            Ok(transition) => transition,
            Err(RegistryError::NotFound(name)) => {
                return Err(FederationError::UnknownServer(name.to_string()));
            }
            Err(RegistryError::Superseded { .. }) => {
                debug!("backend re-registered during probe; result discarded");
                return self.current_report(server.name()).await;
            }
            Err(other) => return Err(FederationError::Registry(other)),
        };

        let health = match &transition {
            Some(change) => {
                log_transition(change);
                change.to
            }
            None => self
                .registry
                .find(server.name())
                .await?
                .map_or(HealthState::Unknown, |current| current.health()),
        };

        Ok(ProbeReport {
            server: server.name().clone(),
            health,
            error,
            tools_count,
            transition,
        })
    }

    /// Reports the stored state of a backend whose probe result was
    /// discarded.
    async fn current_report(&self, name: &ServerName) -> FederationResult<ProbeReport> {
        let current = self
            .registry
            .find(name)
            .await?
            .ok_or_else(|| FederationError::UnknownServer(name.to_string()))?;
        Ok(ProbeReport {
            server: name.clone(),
            health: current.health(),
            error: current.last_error().map(str::to_owned),
            tools_count: current.catalog().tools().len(),
            transition: None,
        })
    }
}

impl<R, B, C> HealthMonitor<R, B, C>
where
    R: BackendRegistry + 'static,
    B: BackendClient + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Runs [`Self::probe_all`] on the configured interval until `shutdown`
    /// is cancelled.
    ///
    /// The first round starts immediately. A round in flight when shutdown
    /// fires is abandoned.
    #[must_use]
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_secs = self.interval.as_secs(),
                failure_threshold = self.policy.failure_threshold(),
                "health monitor started"
            );

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    result = self.probe_all() => {
                        if let Err(err) = result {
                            warn!(error = %err, "health probe round failed");
                        }
                    }
                }
            }
            info!("health monitor stopped");
        })
    }
}

fn log_transition(change: &HealthTransition) {
    match change.to {
        HealthState::Unhealthy => warn!(
            server = %change.server,
            from = %change.from,
            "backend marked unhealthy"
        ),
        HealthState::Healthy | HealthState::Unknown => info!(
            server = %change.server,
            from = %change.from,
            to = %change.to,
            "backend health changed"
        ),
    }
}

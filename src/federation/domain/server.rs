//! Backend server aggregate root and its registration request.

use super::{
    BackendCatalog, BackendEndpoint, Credential, HealthPolicy, HealthState, HealthTransition,
    ProbeOutcome, ServerName,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request to register (or re-register) a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRegistration {
    name: ServerName,
    endpoint: BackendEndpoint,
    credential: Option<Credential>,
    description: String,
    metadata: BTreeMap<String, Value>,
}

impl ServerRegistration {
    /// Creates a registration without credential, description or metadata.
    #[must_use]
    pub const fn new(name: ServerName, endpoint: BackendEndpoint) -> Self {
        Self {
            name,
            endpoint,
            credential: None,
            description: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Sets the credential presented to the backend.
    #[must_use]
    pub fn with_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// Sets the human description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_owned();
        self
    }

    /// Replaces the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.metadata = metadata.into_iter().collect();
        self
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ServerName {
        &self.name
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }
}

/// Registered backend with its health and cached capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendServer {
    name: ServerName,
    endpoint: BackendEndpoint,
    credential: Option<Credential>,
    description: String,
    metadata: BTreeMap<String, Value>,
    health: HealthState,
    consecutive_failures: u32,
    last_probe_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    catalog: BackendCatalog,
    catalog_refreshed_at: Option<DateTime<Utc>>,
    registration_order: u64,
    generation: u64,
    registered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BackendServer {
    /// Creates a newly registered backend in the `unknown` state.
    #[must_use]
    pub fn new(
        registration: ServerRegistration,
        registration_order: u64,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: registration.name,
            endpoint: registration.endpoint,
            credential: registration.credential,
            description: registration.description,
            metadata: registration.metadata,
            health: HealthState::Unknown,
            consecutive_failures: 0,
            last_probe_at: None,
            last_error: None,
            catalog: BackendCatalog::default(),
            catalog_refreshed_at: None,
            registration_order,
            generation: 0,
            registered_at,
            updated_at: registered_at,
        }
    }

    /// Stamps the entry with the target generation assigned by its registry.
    #[must_use]
    pub const fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ServerName {
        &self.name
    }

    /// Returns the endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Returns the stored credential.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Returns the human description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Returns the current health state.
    #[must_use]
    pub const fn health(&self) -> HealthState {
        self.health
    }

    /// Returns the consecutive probe failure count.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Returns when the last probe completed.
    #[must_use]
    pub const fn last_probe_at(&self) -> Option<DateTime<Utc>> {
        self.last_probe_at
    }

    /// Returns the reason for the last failed probe, cleared on success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the cached capability catalog.
    #[must_use]
    pub const fn catalog(&self) -> &BackendCatalog {
        &self.catalog
    }

    /// Returns when the catalog was last replaced.
    #[must_use]
    pub const fn catalog_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.catalog_refreshed_at
    }

    /// Returns the position of this backend in registration order.
    #[must_use]
    pub const fn registration_order(&self) -> u64 {
        self.registration_order
    }

    /// Returns the target generation.
    ///
    /// Probe results computed against one generation are discarded once the
    /// entry has moved on to another.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the first registration timestamp.
    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a re-registration of the same name.
    ///
    /// Registration order is kept. When the endpoint or credential changes the
    /// cached state described a different backend, so health returns to
    /// `unknown`, the catalog is cleared and the entry moves to `generation`.
    /// Returns whether that reset happened.
    pub fn apply_registration(
        &mut self,
        registration: ServerRegistration,
        generation: u64,
        updated_at: DateTime<Utc>,
    ) -> bool {
        let target_changed = self.endpoint != registration.endpoint
            || self.credential != registration.credential;

        self.endpoint = registration.endpoint;
        self.credential = registration.credential;
        self.description = registration.description;
        self.metadata = registration.metadata;
        self.updated_at = updated_at;

        if target_changed {
            self.health = HealthState::Unknown;
            self.consecutive_failures = 0;
            self.last_error = None;
            self.last_probe_at = None;
            self.catalog = BackendCatalog::default();
            self.catalog_refreshed_at = None;
            self.generation = generation;
        }
        target_changed
    }

    /// Applies a probe outcome under `policy`.
    pub fn record_probe(
        &mut self,
        outcome: ProbeOutcome,
        policy: HealthPolicy,
        checked_at: DateTime<Utc>,
    ) -> Option<HealthTransition> {
        match outcome {
            ProbeOutcome::Success => self.record_probe_success(checked_at),
            ProbeOutcome::Failure { reason } => {
                self.record_probe_failure(reason, policy, checked_at)
            }
        }
    }

    /// Resets the failure counter and marks the backend healthy.
    pub fn record_probe_success(&mut self, checked_at: DateTime<Utc>) -> Option<HealthTransition> {
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_probe_at = Some(checked_at);
        self.updated_at = checked_at;
        self.transition_to(HealthState::Healthy, checked_at)
    }

    /// Counts a failed probe, marking the backend unhealthy at the threshold.
    pub fn record_probe_failure(
        &mut self,
        reason: impl Into<String>,
        policy: HealthPolicy,
        checked_at: DateTime<Utc>,
    ) -> Option<HealthTransition> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(reason.into());
        self.last_probe_at = Some(checked_at);
        self.updated_at = checked_at;

        if self.consecutive_failures >= policy.failure_threshold() {
            return self.transition_to(HealthState::Unhealthy, checked_at);
        }
        None
    }

    /// Replaces the cached catalog.
    pub fn replace_catalog(&mut self, catalog: BackendCatalog, refreshed_at: DateTime<Utc>) {
        self.catalog = catalog;
        self.catalog_refreshed_at = Some(refreshed_at);
        self.updated_at = refreshed_at;
    }

    fn transition_to(
        &mut self,
        target: HealthState,
        at: DateTime<Utc>,
    ) -> Option<HealthTransition> {
        if self.health == target {
            return None;
        }
        let from = self.health;
        self.health = target;
        Some(HealthTransition {
            server: self.name.clone(),
            from,
            to: target,
            at,
        })
    }
}

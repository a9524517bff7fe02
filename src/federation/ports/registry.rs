//! Registry port for backend servers and their mutable state.

use crate::federation::domain::{
    BackendCatalog, BackendServer, HealthPolicy, HealthTransition, ProbeOutcome, ServerName,
    ServerRegistration,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result of inserting or replacing a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Snapshot of the stored backend after the write.
    pub server: BackendServer,
    /// Whether the name was not registered before.
    pub created: bool,
    /// Whether an existing entry was reset because its endpoint or credential
    /// changed.
    pub target_changed: bool,
}

/// Store of registered backends.
///
/// Writes to one entry are mutually exclusive; writes to different entries
/// may proceed concurrently. Reads return complete snapshots. Every entry
/// carries a generation that changes whenever the name is bound to a new
/// target, including after removal and re-insertion, so results computed
/// against an older snapshot can be rejected.
#[async_trait]
pub trait BackendRegistry: Send + Sync {
    /// Inserts a registration, or applies it to the entry of the same name.
    async fn upsert(
        &self,
        registration: ServerRegistration,
        at: DateTime<Utc>,
    ) -> RegistryResult<UpsertOutcome>;

    /// Removes an entry, returning it when it existed.
    async fn remove(&self, name: &ServerName) -> RegistryResult<Option<BackendServer>>;

    /// Finds an entry by name.
    async fn find(&self, name: &ServerName) -> RegistryResult<Option<BackendServer>>;

    /// Returns every entry in registration order.
    async fn list(&self) -> RegistryResult<Vec<BackendServer>>;

    /// Returns routable entries in registration order.
    async fn list_healthy(&self) -> RegistryResult<Vec<BackendServer>>;

    /// Applies a probe outcome to an entry if it is still at `generation`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the entry was removed and
    /// [`RegistryError::Superseded`] when it was re-registered with a new
    /// target since the probe started.
    async fn record_probe(
        &self,
        name: &ServerName,
        generation: u64,
        outcome: ProbeOutcome,
        policy: HealthPolicy,
        checked_at: DateTime<Utc>,
    ) -> RegistryResult<Option<HealthTransition>>;

    /// Replaces an entry's cached catalog if it is still at `generation`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the entry was removed and
    /// [`RegistryError::Superseded`] when it moved to another generation.
    async fn replace_catalog(
        &self,
        name: &ServerName,
        generation: u64,
        catalog: BackendCatalog,
        refreshed_at: DateTime<Utc>,
    ) -> RegistryResult<()>;
}

/// Errors returned by registry implementations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The backend is not registered.
    #[error("backend server not registered: {0}")]
    NotFound(ServerName),

    /// The entry was re-registered with a new target after the write was
    /// computed.
    #[error("backend server {server} was re-registered (generation {expected} is now {current})")]
    Superseded {
        /// Backend name.
        server: ServerName,
        /// Generation the write was computed against.
        expected: u64,
        /// Generation currently stored.
        current: u64,
    },

    /// Storage-layer failure.
    #[error("registry storage error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl RegistryError {
    /// Wraps a storage-layer failure.
    #[must_use]
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

//! In-memory backend registry with per-entry locking.

use crate::federation::{
    domain::{
        BackendCatalog, BackendServer, HealthPolicy, HealthTransition, ProbeOutcome, ServerName,
        ServerRegistration,
    },
    ports::{BackendRegistry, RegistryError, RegistryResult, UpsertOutcome},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Entry = Arc<RwLock<BackendServer>>;

/// Thread-safe in-memory backend registry.
///
/// The outer lock guards membership; each entry has its own lock, so probe
/// results and catalog refreshes for different backends do not contend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackendRegistry {
    state: Arc<RwLock<InMemoryRegistryState>>,
}

#[derive(Debug, Default)]
struct InMemoryRegistryState {
    entries: HashMap<ServerName, Entry>,
    next_order: u64,
    next_generation: u64,
}

impl InMemoryRegistryState {
    fn allocate_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation = generation.saturating_add(1);
        generation
    }
}

impl InMemoryBackendRegistry {
    /// Creates an empty in-memory registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot_where(
        &self,
        keep: impl Fn(&BackendServer) -> bool,
    ) -> RegistryResult<Vec<BackendServer>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut servers = Vec::with_capacity(state.entries.len());
        for entry in state.entries.values() {
            let server = entry.read().map_err(lock_error)?;
            if keep(&server) {
                servers.push(server.clone());
            }
        }
        servers.sort_by_key(BackendServer::registration_order);
        Ok(servers)
    }

    fn with_entry_at<T>(
        &self,
        name: &ServerName,
        generation: u64,
        update: impl FnOnce(&mut BackendServer) -> T,
    ) -> RegistryResult<T> {
        let state = self.state.read().map_err(lock_error)?;
        let entry = state
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
        let mut server = entry.write().map_err(lock_error)?;
        if server.generation() != generation {
            return Err(RegistryError::Superseded {
                server: name.clone(),
                expected: generation,
                current: server.generation(),
            });
        }
        Ok(update(&mut server))
    }
}

fn lock_error(err: impl std::fmt::Display) -> RegistryError {
    RegistryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl BackendRegistry for InMemoryBackendRegistry {
    async fn upsert(
        &self,
        registration: ServerRegistration,
        at: DateTime<Utc>,
    ) -> RegistryResult<UpsertOutcome> {
        let mut state = self.state.write().map_err(lock_error)?;
        let generation = state.allocate_generation();

        if let Some(entry) = state.entries.get(registration.name()) {
            let mut server = entry.write().map_err(lock_error)?;
            let target_changed = server.apply_registration(registration, generation, at);
            return Ok(UpsertOutcome {
                server: server.clone(),
                created: false,
                target_changed,
            });
        }

        let order = state.next_order;
        state.next_order = order.saturating_add(1);
        let server = BackendServer::new(registration, order, at).with_generation(generation);
        state
            .entries
            .insert(server.name().clone(), Arc::new(RwLock::new(server.clone())));
        Ok(UpsertOutcome {
            server,
            created: true,
            target_changed: false,
        })
    }

    async fn remove(&self, name: &ServerName) -> RegistryResult<Option<BackendServer>> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(entry) = state.entries.remove(name) else {
            return Ok(None);
        };
        let server = entry.read().map_err(lock_error)?;
        Ok(Some(server.clone()))
    }

    async fn find(&self, name: &ServerName) -> RegistryResult<Option<BackendServer>> {
        let state = self.state.read().map_err(lock_error)?;
        let Some(entry) = state.entries.get(name) else {
            return Ok(None);
        };
        let server = entry.read().map_err(lock_error)?;
        Ok(Some(server.clone()))
    }

    async fn list(&self) -> RegistryResult<Vec<BackendServer>> {
        self.snapshot_where(|_| true)
    }

    async fn list_healthy(&self) -> RegistryResult<Vec<BackendServer>> {
        self.snapshot_where(|server| server.health().is_routable())
    }

    async fn record_probe(
        &self,
        name: &ServerName,
        generation: u64,
        outcome: ProbeOutcome,
        policy: HealthPolicy,
        checked_at: DateTime<Utc>,
    ) -> RegistryResult<Option<HealthTransition>> {
        self.with_entry_at(name, generation, |server| {
            server.record_probe(outcome, policy, checked_at)
        })
    }

    async fn replace_catalog(
        &self,
        name: &ServerName,
        generation: u64,
        catalog: BackendCatalog,
        refreshed_at: DateTime<Utc>,
    ) -> RegistryResult<()> {
        self.with_entry_at(name, generation, |server| {
            server.replace_catalog(catalog, refreshed_at);
        })
    }
}

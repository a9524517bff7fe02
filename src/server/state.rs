//! Shared state handed to every handler.

use crate::federation::{
    ports::{BackendClient, BackendRegistry},
    services::FederationService,
};
use mockable::Clock;
use std::sync::Arc;

/// Handler state: the federation facade.
pub struct AppState<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    /// Federation facade shared by all requests.
    pub service: Arc<FederationService<R, B, C>>,
}

impl<R, B, C> AppState<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    /// Wraps a facade.
    #[must_use]
    pub const fn new(service: Arc<FederationService<R, B, C>>) -> Self {
        Self { service }
    }
}

impl<R, B, C> Clone for AppState<R, B, C>
where
    R: BackendRegistry,
    B: BackendClient,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

//! Application services for backend federation.

mod aggregator;
mod dispatcher;
mod error;
mod federation;
mod health;
mod router;

pub use aggregator::CapabilityAggregator;
pub use dispatcher::Dispatcher;
pub use error::{FederationError, FederationResult};
pub use federation::{
    FederationService, FederationSettings, FederationStats, RegisterServerRequest,
    RegisteredServer, RouteOutcome, ServerDetail, ServerSummary,
};
pub use health::{HealthMonitor, ProbeReport};
pub use router::Router;

//! Domain model for backend federation.
//!
//! The federation domain models backend identity, endpoints and credentials,
//! the per-backend health state machine, cached and namespaced capabilities,
//! routing decisions and workflow plans. Transport and storage concerns remain
//! outside this boundary.

mod catalog;
mod endpoint;
mod error;
mod health;
mod ids;
mod resource;
mod routing;
mod server;
mod tool;
mod workflow;

pub use catalog::{AggregatedCatalog, BackendCatalog, CatalogServer};
pub use endpoint::{BackendEndpoint, Credential};
pub use error::FederationDomainError;
pub use health::{
    DEFAULT_FAILURE_THRESHOLD, HealthPolicy, HealthState, HealthTransition, ProbeOutcome,
};
pub use ids::{ServerName, StepId};
pub use resource::{BackendResource, QualifiedResourceUri, ResourceDescriptor};
pub use routing::{Confidence, Route, RoutingDecision, RoutingRequest, RoutingStrategy};
pub use server::{BackendServer, ServerRegistration};
pub use tool::{BackendTool, QualifiedToolName, ToolDescriptor};
pub use workflow::{
    STEPS_VARIABLE, StepFailure, StepReport, WorkflowPlan, WorkflowReport, WorkflowStep,
    refers_to_steps,
};

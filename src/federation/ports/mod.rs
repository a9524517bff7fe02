//! Port contracts for backend federation.

mod backend;
mod reasoning;
mod registry;

pub use backend::{BackendCallError, BackendCallResult, BackendClient};
#[cfg(test)]
pub use reasoning::MockReasoningBackend;
pub use reasoning::{ReasoningBackend, ReasoningError, ReasoningPrompt, ReasoningResult};
pub use registry::{BackendRegistry, RegistryError, RegistryResult, UpsertOutcome};

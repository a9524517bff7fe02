//! In-memory adapters for the registry and for scripted backends.

mod backend;
mod registry;

pub use backend::{InMemoryBackendClient, RecordedCall};
pub use registry::InMemoryBackendRegistry;

//! Port for the injected text-reasoning capability used by the router.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result type for reasoning calls.
pub type ReasoningResult<T> = Result<T, ReasoningError>;

/// Prompt sent to a reasoning backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningPrompt {
    /// Instructions describing the expected reply format.
    pub system: String,
    /// Request and candidate catalog.
    pub user: String,
}

/// Text-reasoning capability that proposes routing decisions.
///
/// Replies are untrusted; callers validate them against the live catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Returns the backend's reply parsed as a JSON object.
    async fn complete(&self, prompt: &ReasoningPrompt) -> ReasoningResult<Value>;
}

/// Errors returned by reasoning backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReasoningError {
    /// The reasoning service could not be reached.
    #[error("reasoning transport failure: {0}")]
    Transport(String),

    /// The reasoning service answered with a non-success status.
    #[error("reasoning service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The reply could not be interpreted as a JSON object.
    #[error("reasoning reply was not valid JSON: {0}")]
    InvalidReply(String),
}

//! Routing requests, decisions and confidence scores.

use super::{FederationDomainError, QualifiedToolName, ServerName, WorkflowPlan};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Confidence score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Fixed confidence reported by the keyword fallback strategy.
    pub const FALLBACK: Self = Self(0.3);

    /// Creates a confidence score.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::ConfidenceOutOfRange`] when the value
    /// is outside `[0, 1]` or not a number.
    pub fn new(value: f64) -> Result<Self, FederationDomainError> {
        if (0.0..=1.0).contains(&value) {
            return Ok(Self(value));
        }
        Err(FederationDomainError::ConfidenceOutOfRange(value.to_string()))
    }

    /// Returns the score.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = FederationDomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

/// Strategy that produced a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Decided by the injected reasoning backend and validated.
    Reasoning,
    /// Decided by deterministic keyword matching; a degraded decision.
    Fallback,
}

impl RoutingStrategy {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for RoutingStrategy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Natural-language routing request with optional structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRequest {
    text: String,
    context: Map<String, Value>,
}

impl RoutingRequest {
    /// Creates a routing request.
    ///
    /// Non-object context values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError::EmptyRoutingRequest`] when the text is
    /// empty after trimming.
    pub fn new(
        text: impl Into<String>,
        context: Option<Value>,
    ) -> Result<Self, FederationDomainError> {
        let normalized = text.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(FederationDomainError::EmptyRoutingRequest);
        }
        let context_fields = match context {
            Some(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        Ok(Self {
            text: normalized,
            context: context_fields,
        })
    }

    /// Returns the request text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the structured context fields.
    #[must_use]
    pub const fn context(&self) -> &Map<String, Value> {
        &self.context
    }
}

/// Choice of backend, tool and arguments for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Selected backend.
    pub server: ServerName,
    /// Selected tool, as known to its backend.
    pub tool: String,
    /// Arguments to pass to the tool.
    pub arguments: Value,
    /// Free-text explanation.
    pub reasoning: String,
    /// Confidence in the decision.
    pub confidence: Confidence,
    /// Strategy that produced the decision.
    pub strategy: RoutingStrategy,
}

impl RoutingDecision {
    /// Returns the qualified tool reference.
    #[must_use]
    pub fn qualified_tool(&self) -> QualifiedToolName {
        QualifiedToolName::new(self.server.clone(), self.tool.clone())
    }

    /// Returns whether this decision came from the degraded fallback strategy.
    #[must_use]
    pub const fn is_low_confidence(&self) -> bool {
        matches!(self.strategy, RoutingStrategy::Fallback)
    }
}

/// Router output: a single call or an ordered workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Route {
    /// One backend call.
    Single(RoutingDecision),
    /// Several dependent backend calls.
    Workflow(WorkflowPlan),
}

impl Route {
    /// Returns the strategy that produced this route.
    #[must_use]
    pub const fn strategy(&self) -> RoutingStrategy {
        match self {
            Self::Single(decision) => decision.strategy,
            Self::Workflow(plan) => plan.strategy(),
        }
    }
}

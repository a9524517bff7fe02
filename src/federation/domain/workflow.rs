//! Multi-step workflow plans and their execution reports.
//!
//! Step arguments are JSON templates. String leaves may contain expressions
//! such as `{{ steps.create_user.user_id }}` that refer to the output of an
//! earlier step; they are resolved when the step runs, never at planning time.
//! A string with no `{{ steps.<id> }}` expression is passed to the backend
//! verbatim, even when it contains other template delimiters.

use super::{Confidence, FederationDomainError, RoutingStrategy, ServerName, StepId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Variable under which earlier step outputs are exposed to templates.
pub const STEPS_VARIABLE: &str = "steps";

/// One backend call inside a workflow plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step identifier, referenced by later steps.
    pub id: StepId,
    /// Backend to call.
    pub server: ServerName,
    /// Tool to call, as known to its backend.
    pub tool: String,
    /// Argument template.
    pub arguments: Value,
}

impl WorkflowStep {
    /// Returns the step identifiers referenced by this step's argument template.
    #[must_use]
    pub fn referenced_steps(&self) -> BTreeSet<String> {
        let mut references = BTreeSet::new();
        collect_references(&self.arguments, &mut references);
        references
    }
}

/// Returns whether `text` contains an expression referring to an earlier
/// step's output.
#[must_use]
pub fn refers_to_steps(text: &str) -> bool {
    let mut references = BTreeSet::new();
    scan_text(text, &mut references);
    !references.is_empty()
}

fn collect_references(template: &Value, references: &mut BTreeSet<String>) {
    match template {
        Value::String(text) => scan_text(text, references),
        Value::Array(items) => {
            for item in items {
                collect_references(item, references);
            }
        }
        Value::Object(fields) => {
            for value in fields.values() {
                collect_references(value, references);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

fn scan_text(text: &str, references: &mut BTreeSet<String>) {
    let marker = format!("{STEPS_VARIABLE}.");
    let mut remaining = text;
    while let Some((_, after_open)) = remaining.split_once("{{") {
        let (expression, after_close) = after_open.split_once("}}").unwrap_or((after_open, ""));
        for (position, _) in expression.match_indices(&marker) {
            let preceded_by_identifier = expression
                .get(..position)
                .and_then(|before| before.chars().next_back())
                .is_some_and(|character| character.is_ascii_alphanumeric() || character == '_');
            if preceded_by_identifier {
                continue;
            }
            let reference: String = expression
                .get(position + marker.len()..)
                .unwrap_or_default()
                .chars()
                .take_while(|character| character.is_ascii_alphanumeric() || *character == '_')
                .collect();
            if !reference.is_empty() {
                references.insert(reference);
            }
        }
        remaining = after_close;
    }
}

/// Ordered sequence of dependent backend calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowPlan {
    steps: Vec<WorkflowStep>,
    reasoning: String,
    confidence: Confidence,
    strategy: RoutingStrategy,
}

impl WorkflowPlan {
    /// Creates a validated plan.
    ///
    /// # Errors
    ///
    /// Returns [`FederationDomainError`] when the plan is empty, step
    /// identifiers repeat or a step references a step that does not run
    /// before it.
    pub fn new(
        steps: Vec<WorkflowStep>,
        reasoning: impl Into<String>,
        confidence: Confidence,
        strategy: RoutingStrategy,
    ) -> Result<Self, FederationDomainError> {
        if steps.is_empty() {
            return Err(FederationDomainError::EmptyWorkflow);
        }

        let mut earlier: BTreeSet<&str> = BTreeSet::new();
        for step in &steps {
            for reference in step.referenced_steps() {
                if !earlier.contains(reference.as_str()) {
                    return Err(FederationDomainError::UnresolvableStepReference {
                        step: step.id.to_string(),
                        reference,
                    });
                }
            }
            if !earlier.insert(step.id.as_str()) {
                return Err(FederationDomainError::DuplicateStepId(step.id.to_string()));
            }
        }

        Ok(Self {
            steps,
            reasoning: reasoning.into(),
            confidence,
            strategy,
        })
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    /// Returns the planner's explanation.
    #[must_use]
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Returns the planner's confidence.
    #[must_use]
    pub const fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Returns the strategy that produced the plan.
    #[must_use]
    pub const fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }
}

/// Result of one completed workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Step identifier.
    pub id: StepId,
    /// Backend that served the step.
    pub server: ServerName,
    /// Tool that was called.
    pub tool: String,
    /// Arguments after template resolution.
    pub arguments: Value,
    /// Raw tool result.
    pub result: Value,
    /// Value exposed to later steps as `steps.<id>`.
    pub output: Value,
}

/// The step at which a workflow stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// Step identifier.
    pub id: StepId,
    /// Backend the step targeted.
    pub server: ServerName,
    /// Tool the step targeted.
    pub tool: String,
    /// Failure description.
    pub error: String,
}

/// Outcome of executing a workflow plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowReport {
    /// Steps that completed, in execution order.
    pub completed: Vec<StepReport>,
    /// The failing step, when execution stopped early.
    pub failure: Option<StepFailure>,
}

impl WorkflowReport {
    /// Returns whether every step completed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

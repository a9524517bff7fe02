//! Execution of routing decisions and workflow plans against backends.

use super::{FederationError, FederationResult, aggregator::millis};
use crate::federation::{
    domain::{
        BackendServer, QualifiedResourceUri, QualifiedToolName, RoutingDecision, STEPS_VARIABLE,
        ServerName, StepReport, WorkflowPlan, WorkflowReport, WorkflowStep, refers_to_steps,
    },
    ports::{BackendCallError, BackendCallResult, BackendClient, BackendRegistry},
};
use crate::protocol::error_codes;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Performs backend calls with validation, timeout and a single retry.
///
/// Dropping a returned future aborts the backend call in flight.
pub struct Dispatcher<R, B>
where
    R: BackendRegistry,
    B: BackendClient,
{
    registry: Arc<R>,
    client: Arc<B>,
    call_timeout: Duration,
    retry_backoff: Duration,
}

impl<R, B> Dispatcher<R, B>
where
    R: BackendRegistry,
    B: BackendClient,
{
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(
        registry: Arc<R>,
        client: Arc<B>,
        call_timeout: Duration,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            registry,
            client,
            call_timeout,
            retry_backoff,
        }
    }

    /// Executes a routing decision.
    ///
    /// # Errors
    ///
    /// See [`Self::call_tool`].
    pub async fn execute(&self, decision: &RoutingDecision) -> FederationResult<Value> {
        self.call_tool(&decision.qualified_tool(), decision.arguments.clone())
            .await
    }

    /// Calls a tool on its owning backend and returns the raw result.
    ///
    /// # Errors
    ///
    /// Before any network call: [`FederationError::UnknownServer`],
    /// [`FederationError::ServerUnavailable`] or
    /// [`FederationError::UnknownTool`]. After the call and its retry:
    /// [`FederationError::BackendUnreachable`] or
    /// [`FederationError::BackendProtocolError`].
    #[instrument(skip(self, arguments), fields(tool = %tool))]
    pub async fn call_tool(
        &self,
        tool: &QualifiedToolName,
        arguments: Value,
    ) -> FederationResult<Value> {
        let server = self.routable_server(tool.server()).await?;
        if server.catalog().tool(tool.tool()).is_none() {
            return Err(FederationError::UnknownTool(tool.to_string()));
        }
        self.with_retry(&server, || {
            self.client
                .call_tool(&server, tool.tool(), arguments.clone())
        })
        .await
    }

    /// Reads a resource from its owning backend.
    ///
    /// # Errors
    ///
    /// As [`Self::call_tool`], with [`FederationError::UnknownResource`] in
    /// place of the unknown-tool error.
    #[instrument(skip(self), fields(resource = %resource))]
    pub async fn read_resource(&self, resource: &QualifiedResourceUri) -> FederationResult<Value> {
        let server = self.routable_server(resource.server()).await?;
        if server.catalog().resource(resource.uri()).is_none() {
            return Err(FederationError::UnknownResource(resource.to_string()));
        }
        self.with_retry(&server, || {
            self.client.read_resource(&server, resource.uri())
        })
        .await
    }

    /// Executes a plan's steps strictly in order.
    ///
    /// Every step target is validated before the first call. Each step's
    /// templates are resolved against the outputs of the steps before it.
    ///
    /// # Errors
    ///
    /// Validation errors are returned as they are. A failing step yields
    /// [`FederationError::WorkflowStepFailed`] carrying the completed steps;
    /// later steps are never attempted.
    #[instrument(skip(self, plan), fields(steps = plan.steps().len()))]
    pub async fn execute_workflow(&self, plan: &WorkflowPlan) -> FederationResult<WorkflowReport> {
        for step in plan.steps() {
            let server = self.routable_server(&step.server).await?;
            if server.catalog().tool(&step.tool).is_none() {
                return Err(FederationError::UnknownTool(format!(
                    "{}.{}",
                    step.server, step.tool
                )));
            }
        }

        let mut outputs = Map::new();
        let mut completed: Vec<StepReport> = Vec::with_capacity(plan.steps().len());
        for step in plan.steps() {
            match self.run_step(step, &outputs).await {
                Ok(report) => {
                    debug!(step = %step.id, "workflow step completed");
                    outputs.insert(step.id.to_string(), report.output.clone());
                    completed.push(report);
                }
                Err(source) => {
                    warn!(step = %step.id, error = %source, "workflow stopped");
                    return Err(FederationError::WorkflowStepFailed {
                        step_id: step.id.clone(),
                        completed,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(WorkflowReport {
            completed,
            failure: None,
        })
    }

    async fn run_step(
        &self,
        step: &WorkflowStep,
        outputs: &Map<String, Value>,
    ) -> FederationResult<StepReport> {
        let arguments = resolve_arguments(&step.arguments, outputs).map_err(|reason| {
            FederationError::TemplateResolution {
                step_id: step.id.clone(),
                reason,
            }
        })?;
        let result = self
            .call_tool(
                &QualifiedToolName::new(step.server.clone(), step.tool.clone()),
                arguments.clone(),
            )
            .await?;
        if result.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(FederationError::BackendProtocolError {
                server: step.server.clone(),
                code: error_codes::INTERNAL_ERROR,
                message: tool_error_message(&result),
            });
        }

        Ok(StepReport {
            id: step.id.clone(),
            server: step.server.clone(),
            tool: step.tool.clone(),
            arguments,
            output: step_output(&result),
            result,
        })
    }

    async fn routable_server(&self, name: &ServerName) -> FederationResult<BackendServer> {
        let server = self
            .registry
            .find(name)
            .await?
            .ok_or_else(|| FederationError::UnknownServer(name.to_string()))?;
        if !server.health().is_routable() {
            return Err(FederationError::ServerUnavailable {
                server: name.clone(),
                health: server.health(),
            });
        }
        Ok(server)
    }

    async fn with_retry<T, F, Fut>(&self, server: &BackendServer, mut call: F) -> FederationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BackendCallResult<T>>,
    {
        let outcome = match self.bounded(call()).await {
            Err(err) if err.is_transient() => {
                warn!(server = %server.name(), error = %err, "retrying backend call");
                tokio::time::sleep(self.retry_backoff).await;
                self.bounded(call()).await
            }
            other => other,
        };
        outcome.map_err(|err| FederationError::from_backend(server.name(), err))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = BackendCallResult<T>>,
    ) -> BackendCallResult<T> {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(BackendCallError::Timeout {
                    after_ms: millis(self.call_timeout),
                })
            })
    }
}

fn resolve_arguments(template: &Value, outputs: &Map<String, Value>) -> Result<Value, String> {
    let mut environment = Environment::new();
    environment.set_undefined_behavior(UndefinedBehavior::Strict);
    let mut context = Map::new();
    context.insert(STEPS_VARIABLE.to_owned(), Value::Object(outputs.clone()));
    resolve_value(&environment, template, &Value::Object(context))
}

fn resolve_value(
    environment: &Environment<'_>,
    template: &Value,
    context: &Value,
) -> Result<Value, String> {
    match template {
        Value::String(text) => resolve_text(environment, text, context),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(environment, item, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| {
                resolve_value(environment, value, context).map(|resolved| (key.clone(), resolved))
            })
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(template.clone()),
    }
}

fn resolve_text(
    environment: &Environment<'_>,
    text: &str,
    context: &Value,
) -> Result<Value, String> {
    if !refers_to_steps(text) {
        return Ok(Value::String(text.to_owned()));
    }

    if let Some(expression) = single_expression(text) {
        let value = environment
            .compile_expression(expression)
            .and_then(|compiled| compiled.eval(context))
            .map_err(|err| err.to_string())?;
        if value.is_undefined() {
            return Err(format!("'{expression}' is undefined"));
        }
        return serde_json::to_value(&value).map_err(|err| err.to_string());
    }

    environment
        .render_str(text, context)
        .map(Value::String)
        .map_err(|err| err.to_string())
}

/// Returns the expression when `text` consists of exactly one `{{ ... }}`.
fn single_expression(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
        return None;
    }
    Some(inner.trim())
}

fn text_contents(result: &Value) -> Vec<&str> {
    result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

/// Value a completed step exposes to later steps.
fn step_output(result: &Value) -> Value {
    if let Some(structured) = result
        .get("structuredContent")
        .filter(|structured| !structured.is_null())
    {
        return structured.clone();
    }
    match text_contents(result).as_slice() {
        [text] => serde_json::from_str(text).unwrap_or_else(|_| Value::String((*text).to_owned())),
        _ => result.clone(),
    }
}

fn tool_error_message(result: &Value) -> String {
    let texts = text_contents(result);
    if texts.is_empty() {
        return "tool reported an error".to_owned();
    }
    texts.join("\n")
}

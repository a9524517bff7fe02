//! Request routing over the aggregated catalog.
//!
//! Routing prefers the injected reasoning backend and always keeps a
//! deterministic keyword strategy available. Reasoning replies are untrusted:
//! they are validated against the live catalog, retried once with the
//! rejection reason as a hint, and otherwise replaced by the fallback.

use super::{FederationError, FederationResult};
use crate::federation::{
    domain::{
        AggregatedCatalog, Confidence, QualifiedToolName, Route, RoutingDecision, RoutingRequest,
        RoutingStrategy, ServerName, StepId, ToolDescriptor, WorkflowPlan, WorkflowStep,
    },
    ports::{ReasoningBackend, ReasoningError, ReasoningPrompt},
};
use minijinja::Environment;
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

const MAX_REASONING_ATTEMPTS: usize = 2;

const SYSTEM_PROMPT: &str = r#"You route user requests to tools exposed by federated backend servers.
Reply with a single JSON object and nothing else.
For one tool call reply with:
{"server": "<server>", "tool": "<tool>", "arguments": {...}, "reasoning": "<why>", "confidence": <0.0 to 1.0>}
When the request needs several dependent calls reply with:
{"multi_step": true, "steps": [{"id": "step1", "server": "<server>", "tool": "<tool>", "arguments": {...}}], "reasoning": "<why>", "confidence": <0.0 to 1.0>}
A later step may use an earlier step's output through a string such as "{{ steps.step1.user_id }}".
Only use servers and tools from the list you are given and supply every required argument."#;

const USER_TEMPLATE: &str = "\
Request: {{ request }}
{% if context %}Context: {{ context }}
{% endif %}
Available servers and tools:
{% for server in servers %}- {{ server.name }}{% if server.description %}: {{ server.description }}{% endif %}
{% for tool in server.tools %}  - {{ tool.name }}: {{ tool.description }}{% if tool.required %} (required: {{ tool.required | join(\", \") }}){% endif %}
{% endfor %}{% endfor %}{% if hint %}
Your previous answer was rejected: {{ hint }}
Answer again using only the servers and tools listed above.
{% endif %}";

const STOP_WORDS: &[&str] = &[
    "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "in", "into", "is",
    "it", "me", "my", "of", "on", "or", "please", "that", "the", "this", "to", "with", "you",
];

/// Why the reasoning strategy produced no route.
#[derive(Debug, Error)]
enum ReasoningFailure {
    #[error("reasoning backend unavailable: {0}")]
    Unavailable(ReasoningError),

    #[error("reasoning backend timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    #[error("reasoning prompt could not be rendered: {0}")]
    Prompt(String),

    #[error("reasoning reply rejected: {0}")]
    Rejected(String),
}

/// Maps requests to routes over the healthy catalog.
#[derive(Clone)]
pub struct Router {
    reasoner: Option<Arc<dyn ReasoningBackend>>,
    reasoning_timeout: Duration,
}

impl Router {
    /// Creates a router. Without a reasoner only the keyword fallback runs.
    #[must_use]
    pub const fn new(
        reasoner: Option<Arc<dyn ReasoningBackend>>,
        reasoning_timeout: Duration,
    ) -> Self {
        Self {
            reasoner,
            reasoning_timeout,
        }
    }

    /// Returns whether a reasoning backend is configured.
    #[must_use]
    pub const fn reasoning_enabled(&self) -> bool {
        self.reasoner.is_some()
    }

    /// Routes `request` against `catalog`.
    ///
    /// Reasoning failures never surface; they select the fallback strategy.
    ///
    /// # Errors
    ///
    /// Returns [`FederationError::RoutingLowConfidence`] when no healthy tool
    /// matches the request.
    #[instrument(skip_all, fields(request = %request.text()))]
    pub async fn route(
        &self,
        request: &RoutingRequest,
        catalog: &AggregatedCatalog,
    ) -> FederationResult<Route> {
        if catalog.tools().is_empty() {
            return Err(FederationError::RoutingLowConfidence {
                request: request.text().to_owned(),
            });
        }

        if let Some(reasoner) = &self.reasoner {
            match self.reason(reasoner.as_ref(), request, catalog).await {
                Ok(route) => {
                    log_route(&route);
                    return Ok(route);
                }
                Err(failure) => warn!(error = %failure, "falling back to keyword routing"),
            }
        }

        let route = Route::Single(fallback_decision(request, catalog)?);
        log_route(&route);
        Ok(route)
    }

    async fn reason(
        &self,
        reasoner: &dyn ReasoningBackend,
        request: &RoutingRequest,
        catalog: &AggregatedCatalog,
    ) -> Result<Route, ReasoningFailure> {
        let mut hint: Option<String> = None;
        for attempt in 1..=MAX_REASONING_ATTEMPTS {
            let prompt = build_prompt(request, catalog, hint.as_deref())?;
            let reply =
                match tokio::time::timeout(self.reasoning_timeout, reasoner.complete(&prompt)).await
                {
                    Err(_) => {
                        return Err(ReasoningFailure::TimedOut {
                            after_ms: super::aggregator::millis(self.reasoning_timeout),
                        });
                    }
                    Ok(Err(ReasoningError::InvalidReply(reason))) => Err(reason),
                    Ok(Err(other)) => return Err(ReasoningFailure::Unavailable(other)),
                    Ok(Ok(reply)) => validate_reply(reply, catalog),
                };
            match reply {
                Ok(route) => return Ok(route),
                Err(reason) => {
                    warn!(attempt, %reason, "reasoning reply rejected");
                    hint = Some(reason);
                }
            }
        }
        Err(ReasoningFailure::Rejected(hint.unwrap_or_default()))
    }
}

fn log_route(route: &Route) {
    match route {
        Route::Single(decision) => info!(
            server = %decision.server,
            tool = %decision.tool,
            strategy = %decision.strategy,
            confidence = decision.confidence.value(),
            "request routed"
        ),
        Route::Workflow(plan) => info!(
            steps = plan.steps().len(),
            strategy = %plan.strategy(),
            confidence = plan.confidence().value(),
            "request planned as workflow"
        ),
    }
}

fn build_prompt(
    request: &RoutingRequest,
    catalog: &AggregatedCatalog,
    hint: Option<&str>,
) -> Result<ReasoningPrompt, ReasoningFailure> {
    let servers: Vec<Value> = catalog
        .servers()
        .iter()
        .map(|server| {
            let tools: Vec<Value> = catalog
                .tools_of(&server.name)
                .map(|tool| {
                    json!({
                        "name": tool.original_name(),
                        "description": tool.description(),
                        "required": tool.required_arguments(),
                    })
                })
                .collect();
            json!({
                "name": server.name,
                "description": server.description,
                "tools": tools,
            })
        })
        .collect();
    let context = if request.context().is_empty() {
        String::new()
    } else {
        Value::Object(request.context().clone()).to_string()
    };

    let user = Environment::new()
        .render_str(
            USER_TEMPLATE,
            json!({
                "request": request.text(),
                "context": context,
                "servers": servers,
                "hint": hint,
            }),
        )
        .map_err(|err| ReasoningFailure::Prompt(err.to_string()))?;

    Ok(ReasoningPrompt {
        system: SYSTEM_PROMPT.to_owned(),
        user,
    })
}

#[derive(Debug, Deserialize)]
struct ReasoningReply {
    server: Option<String>,
    tool: Option<String>,
    arguments: Option<Value>,
    reasoning: Option<String>,
    confidence: Option<f64>,
    #[serde(default)]
    multi_step: bool,
    #[serde(default)]
    steps: Vec<ReasoningStep>,
}

#[derive(Debug, Deserialize)]
struct ReasoningStep {
    id: Option<String>,
    server: String,
    tool: String,
    arguments: Option<Value>,
}

fn validate_reply(reply: Value, catalog: &AggregatedCatalog) -> Result<Route, String> {
    let parsed: ReasoningReply = serde_json::from_value(reply)
        .map_err(|err| format!("reply did not match the expected shape: {err}"))?;
    let confidence = parsed
        .confidence
        .ok_or_else(|| "reply is missing a confidence score".to_owned())
        .and_then(|value| Confidence::new(value).map_err(|err| err.to_string()))?;
    let reasoning = parsed.reasoning.unwrap_or_default();

    if parsed.multi_step || !parsed.steps.is_empty() {
        return validate_plan(parsed.steps, reasoning, confidence, catalog).map(Route::Workflow);
    }

    let server = parsed
        .server
        .ok_or_else(|| "reply is missing a server".to_owned())?;
    let tool = parsed.tool.ok_or_else(|| "reply is missing a tool".to_owned())?;
    let descriptor = resolve_tool(&server, &tool, catalog)?;
    let arguments = object_arguments(parsed.arguments)?;
    require_arguments(descriptor, &arguments)?;

    Ok(Route::Single(RoutingDecision {
        server: descriptor.server().clone(),
        tool: descriptor.original_name().to_owned(),
        arguments,
        reasoning,
        confidence,
        strategy: RoutingStrategy::Reasoning,
    }))
}

fn validate_plan(
    raw_steps: Vec<ReasoningStep>,
    reasoning: String,
    confidence: Confidence,
    catalog: &AggregatedCatalog,
) -> Result<WorkflowPlan, String> {
    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw) in raw_steps.into_iter().enumerate() {
        let id = match raw.id {
            Some(id) => StepId::new(id).map_err(|err| err.to_string())?,
            None => StepId::new(format!("step{}", index.saturating_add(1)))
                .map_err(|err| err.to_string())?,
        };
        let descriptor = resolve_tool(&raw.server, &raw.tool, catalog)?;
        let arguments = object_arguments(raw.arguments)?;
        require_arguments(descriptor, &arguments).map_err(|reason| format!("step {id}: {reason}"))?;
        steps.push(WorkflowStep {
            id,
            server: descriptor.server().clone(),
            tool: descriptor.original_name().to_owned(),
            arguments,
        });
    }
    WorkflowPlan::new(steps, reasoning, confidence, RoutingStrategy::Reasoning)
        .map_err(|err| err.to_string())
}

fn resolve_tool<'a>(
    server: &str,
    tool: &str,
    catalog: &'a AggregatedCatalog,
) -> Result<&'a ToolDescriptor, String> {
    let name = ServerName::new(server).map_err(|_| format!("unknown server '{server}'"))?;
    if !catalog.contains_server(&name) {
        return Err(format!("server '{name}' is not available"));
    }
    let prefix = format!("{name}.");
    let original = tool.strip_prefix(prefix.as_str()).unwrap_or(tool);
    catalog
        .tool(&QualifiedToolName::new(name.clone(), original.to_owned()))
        .ok_or_else(|| format!("server '{name}' has no tool '{original}'"))
}

fn object_arguments(arguments: Option<Value>) -> Result<Value, String> {
    match arguments {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(Value::Object(fields)) => Ok(Value::Object(fields)),
        Some(_) => Err("arguments must be a JSON object".to_owned()),
    }
}

fn require_arguments(tool: &ToolDescriptor, arguments: &Value) -> Result<(), String> {
    let missing = tool.missing_arguments(arguments);
    if missing.is_empty() {
        return Ok(());
    }
    Err(format!(
        "tool '{}' requires arguments: {}",
        tool.name(),
        missing.join(", ")
    ))
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|character: char| !character.is_alphanumeric())
        .filter(|token| token.chars().count() > 1 && !STOP_WORDS.contains(token))
        .map(str::to_owned)
        .collect()
}

struct Match<'a> {
    score: u32,
    matched: Vec<&'a str>,
}

fn score_tool<'a>(request_tokens: &'a BTreeSet<String>, tool: &ToolDescriptor) -> Match<'a> {
    let mut name_tokens = tokenize(tool.server().as_str());
    name_tokens.extend(tokenize(tool.original_name()));
    let description_tokens = tokenize(tool.description());

    let mut found = Match {
        score: 0,
        matched: Vec::new(),
    };
    for token in request_tokens {
        let weight = if name_tokens.contains(token) {
            2
        } else if description_tokens.contains(token) {
            1
        } else {
            continue;
        };
        found.score = found.score.saturating_add(weight);
        found.matched.push(token.as_str());
    }
    found
}

fn fallback_decision(
    request: &RoutingRequest,
    catalog: &AggregatedCatalog,
) -> FederationResult<RoutingDecision> {
    let request_tokens = tokenize(request.text());
    let best = catalog
        .tools()
        .iter()
        .enumerate()
        .map(|(index, tool)| (index, tool, score_tool(&request_tokens, tool)))
        .filter(|(_, _, found)| found.score > 0)
        .min_by_key(|(index, tool, found)| {
            (
                Reverse(found.score),
                catalog.registration_order(tool.server()).unwrap_or(u64::MAX),
                *index,
            )
        });

    let Some((_, tool, found)) = best else {
        return Err(FederationError::RoutingLowConfidence {
            request: request.text().to_owned(),
        });
    };

    Ok(RoutingDecision {
        server: tool.server().clone(),
        tool: tool.original_name().to_owned(),
        arguments: fill_arguments(tool, request),
        reasoning: format!("keyword match on: {}", found.matched.join(", ")),
        confidence: Confidence::FALLBACK,
        strategy: RoutingStrategy::Fallback,
    })
}

fn fill_arguments(tool: &ToolDescriptor, request: &RoutingRequest) -> Value {
    let properties = tool
        .input_schema()
        .get("properties")
        .and_then(Value::as_object);
    let mut arguments = Map::new();

    for name in tool.argument_names() {
        if let Some(value) = request.context().get(name) {
            arguments.insert(name.to_owned(), value.clone());
        }
    }

    let words: Vec<&str> = request.text().split_whitespace().collect();
    for pair in words.windows(2) {
        let [key, value] = pair else { continue };
        let key_word = trim_word(key);
        let Some((property, schema)) = properties.and_then(|declared| {
            declared
                .iter()
                .find(|(property, _)| property.eq_ignore_ascii_case(key_word))
        }) else {
            continue;
        };
        if !arguments.contains_key(property) {
            arguments.insert(property.clone(), typed_value(trim_word(value), schema));
        }
    }
    Value::Object(arguments)
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|character: char| {
        matches!(character, '"' | '\'' | '`' | ',' | '.' | ';' | ':' | '?' | '!')
    })
}

fn typed_value(raw: &str, schema: &Value) -> Value {
    let text = || Value::String(raw.to_owned());
    match schema.get("type").and_then(Value::as_str) {
        Some("integer") => raw.parse::<i64>().map_or_else(|_| text(), Value::from),
        Some("number") => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or_else(text, Value::Number),
        Some("boolean") => raw.parse::<bool>().map_or_else(|_| text(), Value::Bool),
        _ => text(),
    }
}

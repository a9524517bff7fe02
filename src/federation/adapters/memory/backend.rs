//! In-memory backend client for deterministic federation flows.

use crate::federation::{
    domain::{BackendResource, BackendServer, BackendTool, ServerName},
    ports::{BackendCallError, BackendCallResult, BackendClient},
};
use crate::protocol::error_codes;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// A `tools/call` received by the in-memory client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Target backend.
    pub server: ServerName,
    /// Tool name as known to the backend.
    pub tool: String,
    /// Arguments as received.
    pub arguments: Value,
}

/// Scriptable in-memory stand-in for remote backends.
///
/// Backends are keyed by server name. Unscripted tool calls echo their
/// arguments back as `structuredContent`. Resource listing fails with
/// "method not found" unless resources were configured, matching backends
/// that do not implement resources.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackendClient {
    state: Arc<RwLock<InMemoryBackendState>>,
}

#[derive(Debug, Default)]
struct InMemoryBackendState {
    backends: HashMap<ServerName, ScriptedBackend>,
    calls: Vec<RecordedCall>,
}

#[derive(Debug, Default)]
struct ScriptedBackend {
    tools: Vec<BackendTool>,
    resources: Option<Vec<BackendResource>>,
    resource_contents: HashMap<String, String>,
    unreachable: bool,
    transient_failures: u32,
    latency: Option<Duration>,
    scripted_results: HashMap<String, VecDeque<BackendCallResult<Value>>>,
}

fn lock_error(err: impl std::fmt::Display) -> BackendCallError {
    BackendCallError::Transport(format!("in-memory backend state unavailable: {err}"))
}

impl InMemoryBackendClient {
    /// Creates a client with no backends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn update<T>(
        &self,
        server: &ServerName,
        change: impl FnOnce(&mut ScriptedBackend) -> T,
    ) -> BackendCallResult<T> {
        let mut state = self.state.write().map_err(lock_error)?;
        Ok(change(state.backends.entry(server.clone()).or_default()))
    }

    /// Replaces the tools a backend reports.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn set_tools(&self, server: &ServerName, tools: Vec<BackendTool>) -> BackendCallResult<()> {
        self.update(server, |backend| backend.tools = tools)
    }

    /// Replaces the resources a backend reports.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn set_resources(
        &self,
        server: &ServerName,
        resources: Vec<BackendResource>,
    ) -> BackendCallResult<()> {
        self.update(server, |backend| backend.resources = Some(resources))
    }

    /// Sets the text returned by `resources/read` for `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn set_resource_text(
        &self,
        server: &ServerName,
        uri: impl Into<String>,
        text: impl Into<String>,
    ) -> BackendCallResult<()> {
        self.update(server, |backend| {
            backend.resource_contents.insert(uri.into(), text.into());
        })
    }

    /// Makes every call to a backend fail with a transport error.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn set_unreachable(&self, server: &ServerName, unreachable: bool) -> BackendCallResult<()> {
        self.update(server, |backend| backend.unreachable = unreachable)
    }

    /// Makes the next `count` tool calls to a backend fail with a transport
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn fail_next_calls(&self, server: &ServerName, count: u32) -> BackendCallResult<()> {
        self.update(server, |backend| backend.transient_failures = count)
    }

    /// Delays every reply from a backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn set_latency(&self, server: &ServerName, latency: Duration) -> BackendCallResult<()> {
        self.update(server, |backend| backend.latency = Some(latency))
    }

    /// Queues a result for the next call of `tool`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn push_result(
        &self,
        server: &ServerName,
        tool: impl Into<String>,
        result: BackendCallResult<Value>,
    ) -> BackendCallResult<()> {
        self.update(server, |backend| {
            backend
                .scripted_results
                .entry(tool.into())
                .or_default()
                .push_back(result);
        })
    }

    /// Returns the tool calls received so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns [`BackendCallError::Transport`] when lock acquisition fails.
    pub fn calls(&self) -> BackendCallResult<Vec<RecordedCall>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.calls.clone())
    }

    async fn simulate_latency(&self, server: &ServerName) -> BackendCallResult<()> {
        let latency = {
            let state = self.state.read().map_err(lock_error)?;
            state
                .backends
                .get(server)
                .and_then(|backend| backend.latency)
        };
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn reachable_backend<T>(
        &self,
        server: &BackendServer,
        read: impl FnOnce(&ScriptedBackend) -> BackendCallResult<T>,
    ) -> BackendCallResult<T> {
        let state = self.state.read().map_err(lock_error)?;
        let backend = state
            .backends
            .get(server.name())
            .ok_or_else(|| refused(server.name()))?;
        if backend.unreachable {
            return Err(refused(server.name()));
        }
        read(backend)
    }
}

fn refused(server: &ServerName) -> BackendCallError {
    BackendCallError::Transport(format!("connection refused by {server}"))
}

fn echo_result(arguments: &Value) -> Value {
    json!({
        "content": [{"type": "text", "text": arguments.to_string()}],
        "structuredContent": arguments,
        "isError": false
    })
}

#[async_trait]
impl BackendClient for InMemoryBackendClient {
    async fn list_tools(&self, server: &BackendServer) -> BackendCallResult<Vec<BackendTool>> {
        self.simulate_latency(server.name()).await?;
        self.reachable_backend(server, |backend| Ok(backend.tools.clone()))
    }

    async fn list_resources(
        &self,
        server: &BackendServer,
    ) -> BackendCallResult<Vec<BackendResource>> {
        self.simulate_latency(server.name()).await?;
        self.reachable_backend(server, |backend| {
            backend
                .resources
                .clone()
                .ok_or_else(|| BackendCallError::Protocol {
                    code: error_codes::METHOD_NOT_FOUND,
                    message: "Method not found: resources/list".to_owned(),
                })
        })
    }

    async fn call_tool(
        &self,
        server: &BackendServer,
        tool: &str,
        arguments: Value,
    ) -> BackendCallResult<Value> {
        self.simulate_latency(server.name()).await?;

        let mut state = self.state.write().map_err(lock_error)?;
        state.calls.push(RecordedCall {
            server: server.name().clone(),
            tool: tool.to_owned(),
            arguments: arguments.clone(),
        });

        let backend = state
            .backends
            .get_mut(server.name())
            .ok_or_else(|| refused(server.name()))?;
        if backend.unreachable {
            return Err(refused(server.name()));
        }
        if backend.transient_failures > 0 {
            backend.transient_failures -= 1;
            return Err(BackendCallError::Transport(format!(
                "connection reset by {}",
                server.name()
            )));
        }
        if let Some(result) = backend
            .scripted_results
            .get_mut(tool)
            .and_then(VecDeque::pop_front)
        {
            return result;
        }
        if !backend.tools.iter().any(|known| known.name() == tool) {
            return Err(BackendCallError::Protocol {
                code: error_codes::INVALID_PARAMS,
                message: format!("Unknown tool: {tool}"),
            });
        }
        Ok(echo_result(&arguments))
    }

    async fn read_resource(&self, server: &BackendServer, uri: &str) -> BackendCallResult<Value> {
        self.simulate_latency(server.name()).await?;
        self.reachable_backend(server, |backend| {
            backend
                .resource_contents
                .get(uri)
                .map(|text| json!({"contents": [{"uri": uri, "text": text}]}))
                .ok_or_else(|| BackendCallError::Protocol {
                    code: error_codes::INVALID_PARAMS,
                    message: format!("Unknown resource: {uri}"),
                })
        })
    }
}

//! Natural-language routing and workflow execution.

use super::helpers::{
    FAILURE_THRESHOLD, Gateway, build_gateway, gateway, mongo_tools, redis_tools, server, tool,
};
use async_trait::async_trait;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use switchboard::federation::{
    domain::RoutingStrategy,
    ports::{ReasoningBackend, ReasoningPrompt, ReasoningResult},
    services::{FederationError, RouteOutcome},
};

/// Reasoner that always answers with the same reply and counts calls.
struct ScriptedReasoner {
    reply: Value,
    calls: AtomicUsize,
}

impl ScriptedReasoner {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedReasoner {
    async fn complete(&self, _prompt: &ReasoningPrompt) -> ReasoningResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn with_reasoner(reasoner: &Arc<ScriptedReasoner>) -> Gateway {
    build_gateway(Some(Arc::clone(reasoner) as Arc<dyn ReasoningBackend>))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fallback_routes_and_executes_cache_lookup(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    gateway.register("redis", redis_tools()).await;

    let outcome = gateway
        .service
        .route("get the cached value for key session42", None)
        .await
        .expect("route should succeed");

    let RouteOutcome::Call { routing, result } = outcome else {
        panic!("expected a single call");
    };
    assert_eq!(routing.server, server("redis"));
    assert_eq!(routing.tool, "redis_get");
    assert_eq!(routing.strategy, RoutingStrategy::Fallback);
    assert_eq!(result["structuredContent"], json!({"key": "session42"}));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn fallback_ignores_unhealthy_backends(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    gateway.register("redis", redis_tools()).await;
    gateway.set_unreachable("mongo", true);
    for _ in 0..FAILURE_THRESHOLD {
        gateway.probe("mongo").await;
    }

    let result = gateway
        .service
        .route("find documents in the users collection", None)
        .await;

    assert!(matches!(
        result,
        Err(FederationError::RoutingLowConfidence { .. })
    ));
    assert!(gateway.client.calls().expect("calls").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reasoned_workflow_threads_step_outputs() {
    let reasoner = ScriptedReasoner::new(json!({
        "multi_step": true,
        "steps": [
            {"id": "create_user", "server": "auth", "tool": "create_user", "arguments": {"name": "ada"}},
            {"id": "profile", "server": "profile", "tool": "init_profile", "arguments": {"user_id": "{{ steps.create_user.user_id }}"}}
        ],
        "reasoning": "create the user, then initialise the profile",
        "confidence": 0.9
    }));
    let gateway = with_reasoner(&reasoner);
    gateway
        .register(
            "auth",
            vec![tool("create_user", "Create a user", &[("name", "string")], &["name"])],
        )
        .await;
    gateway
        .register(
            "profile",
            vec![tool(
                "init_profile",
                "Initialise a profile",
                &[("user_id", "integer")],
                &["user_id"],
            )],
        )
        .await;
    gateway
        .client
        .push_result(
            &server("auth"),
            "create_user",
            Ok(json!({"content": [{"type": "text", "text": "{\"user_id\": 42}"}], "isError": false})),
        )
        .expect("result should be scripted");

    let outcome = gateway
        .service
        .route("create user ada and set up a profile", None)
        .await
        .expect("route should succeed");

    let RouteOutcome::Workflow { routing, workflow } = outcome else {
        panic!("expected a workflow");
    };
    assert_eq!(routing.strategy(), RoutingStrategy::Reasoning);
    assert!(workflow.succeeded());
    assert_eq!(workflow.completed.len(), 2);
    let calls = gateway.client.calls().expect("calls");
    let profile_call = calls.last().expect("profile call");
    assert_eq!(profile_call.arguments, json!({"user_id": 42}));
    assert_eq!(reasoner.calls(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_workflow_step_is_reported_with_completed_steps() {
    let reasoner = ScriptedReasoner::new(json!({
        "steps": [
            {"id": "read", "server": "redis", "tool": "redis_get", "arguments": {"key": "a"}},
            {"id": "write", "server": "redis", "tool": "redis_set", "arguments": {"key": "b", "value": "{{ steps.read.key }}"}}
        ],
        "reasoning": "copy a to b",
        "confidence": 0.8
    }));
    let gateway = with_reasoner(&reasoner);
    gateway.register("redis", redis_tools()).await;
    gateway
        .client
        .push_result(
            &server("redis"),
            "redis_set",
            Ok(json!({"content": [{"type": "text", "text": "read-only replica"}], "isError": true})),
        )
        .expect("result should be scripted");

    let outcome = gateway
        .service
        .route("copy the cached value of a into b", None)
        .await
        .expect("a failed step is reported, not returned");

    let RouteOutcome::Workflow { workflow, .. } = outcome else {
        panic!("expected a workflow");
    };
    assert_eq!(workflow.completed.len(), 1);
    let failure = workflow.failure.expect("failure should be reported");
    assert_eq!(failure.id.as_str(), "write");
    assert!(failure.error.contains("read-only replica"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reasoning_reply_naming_unknown_server_falls_back() {
    let reasoner = ScriptedReasoner::new(json!({
        "server": "ghost",
        "tool": "redis_get",
        "arguments": {"key": "k1"},
        "reasoning": "hallucinated",
        "confidence": 0.95
    }));
    let gateway = with_reasoner(&reasoner);
    gateway.register("redis", redis_tools()).await;

    let outcome = gateway
        .service
        .route("get the cached value for key k1", None)
        .await
        .expect("fallback should route");

    let RouteOutcome::Call { routing, .. } = outcome else {
        panic!("expected a single call");
    };
    assert_eq!(routing.strategy, RoutingStrategy::Fallback);
    assert_eq!(routing.server, server("redis"));
    assert_eq!(reasoner.calls(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn context_fields_fill_arguments(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;

    let outcome = gateway
        .service
        .route(
            "find documents in a collection",
            Some(json!({"collection": "orders", "unrelated": true})),
        )
        .await
        .expect("route should succeed");

    let RouteOutcome::Call { routing, .. } = outcome else {
        panic!("expected a single call");
    };
    assert_eq!(routing.tool, "mongo_query");
    assert_eq!(routing.arguments, json!({"collection": "orders"}));
}

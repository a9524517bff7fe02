//! Circuit-breaker exclusion and readmission across the federation.

use super::helpers::{FAILURE_THRESHOLD, Gateway, gateway, mongo_tools, redis_tools};
use rstest::rstest;
use serde_json::json;
use switchboard::federation::{domain::HealthState, services::FederationError};

async fn trip_breaker(gateway: &Gateway, name: &str) {
    gateway.set_unreachable(name, true);
    for _ in 0..FAILURE_THRESHOLD {
        gateway.probe(name).await;
    }
}

async fn health_of(gateway: &Gateway, name: &str) -> HealthState {
    gateway
        .service
        .server_detail(name)
        .await
        .expect("server should exist")
        .summary
        .health
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unhealthy_backend_disappears_from_catalog(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    gateway.register("redis", redis_tools()).await;

    trip_breaker(&gateway, "mongo").await;

    assert_eq!(health_of(&gateway, "mongo").await, HealthState::Unhealthy);
    assert_eq!(
        gateway.tool_names().await,
        vec!["redis.redis_get", "redis.redis_set"]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn calls_to_unhealthy_backend_fail_fast(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    trip_breaker(&gateway, "mongo").await;
    let calls_before = gateway.client.calls().expect("calls").len();

    let result = gateway
        .service
        .call_tool("mongo.mongo_query", json!({"collection": "users"}))
        .await;

    assert!(matches!(
        result,
        Err(FederationError::ServerUnavailable { .. })
    ));
    assert_eq!(gateway.client.calls().expect("calls").len(), calls_before);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failures_below_threshold_keep_backend_routable(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    gateway.set_unreachable("mongo", true);

    for _ in 1..FAILURE_THRESHOLD {
        gateway.probe("mongo").await;
    }

    assert_eq!(health_of(&gateway, "mongo").await, HealthState::Healthy);
    assert_eq!(gateway.tool_names().await.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_successful_probe_readmits_backend(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    trip_breaker(&gateway, "mongo").await;

    gateway.set_unreachable("mongo", false);
    gateway.probe("mongo").await;

    assert_eq!(health_of(&gateway, "mongo").await, HealthState::Healthy);
    let detail = gateway
        .service
        .server_detail("mongo")
        .await
        .expect("server should exist");
    assert_eq!(detail.summary.consecutive_failures, 0);
    let result = gateway
        .service
        .call_tool("mongo.mongo_query", json!({"collection": "users"}))
        .await
        .expect("readmitted backend should accept calls");
    assert_eq!(result["structuredContent"], json!({"collection": "users"}));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_backend_does_not_affect_others(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;
    gateway.register("redis", redis_tools()).await;
    gateway.set_unreachable("mongo", true);

    let reports = gateway
        .service
        .discover(None)
        .await
        .expect("probe round should complete");

    assert_eq!(reports.len(), 2);
    assert_eq!(health_of(&gateway, "redis").await, HealthState::Healthy);
    let redis = gateway
        .service
        .server_detail("redis")
        .await
        .expect("server should exist");
    assert_eq!(redis.summary.consecutive_failures, 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unregistered_backend_is_gone_immediately(gateway: Gateway) {
    gateway.register("mongo", mongo_tools()).await;

    let removed = gateway
        .service
        .unregister_server("mongo")
        .await
        .expect("unregister should succeed");

    assert!(removed);
    assert!(gateway.tool_names().await.is_empty());
    let result = gateway
        .service
        .call_tool("mongo.mongo_query", json!({"collection": "users"}))
        .await;
    assert!(matches!(result, Err(FederationError::UnknownServer(_))));
}

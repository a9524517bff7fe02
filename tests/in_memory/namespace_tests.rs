//! Namespaced catalog, calls and resource reads.

use super::helpers::{Gateway, gateway, server, tool};
use rstest::rstest;
use serde_json::json;
use switchboard::federation::{domain::BackendResource, services::FederationError};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn identical_tool_names_route_to_their_owner(gateway: Gateway) {
    gateway
        .register("s1", vec![tool("query", "Query s1", &[("q", "string")], &[])])
        .await;
    gateway
        .register("s2", vec![tool("query", "Query s2", &[("q", "string")], &[])])
        .await;

    assert_eq!(gateway.tool_names().await, vec!["s1.query", "s2.query"]);

    gateway
        .service
        .call_tool("s2.query", json!({"q": "x"}))
        .await
        .expect("call should succeed");
    let calls = gateway.client.calls().expect("calls");
    let [call] = calls.as_slice() else {
        panic!("expected exactly one backend call");
    };
    assert_eq!(call.server, server("s2"));
    assert_eq!(call.tool, "query");
    assert_eq!(call.arguments, json!({"q": "x"}));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_descriptions_carry_server_tag(gateway: Gateway) {
    gateway
        .register("redis", vec![tool("redis_get", "Get a key", &[("key", "string")], &["key"])])
        .await;

    let tools = gateway.service.list_tools().await.expect("tools should list");
    let [listed] = tools.as_slice() else {
        panic!("expected one tool");
    };
    assert_eq!(listed.name(), "redis.redis_get");
    assert!(listed.description().starts_with("[redis]"));
    assert_eq!(listed.required_arguments(), vec!["key"]);
}

#[rstest]
#[case("redis_get")]
#[case("redis.")]
#[case(".redis_get")]
#[case("redis.unknown_tool")]
#[tokio::test(flavor = "multi_thread")]
async fn unresolvable_tool_names_are_unknown_tools(gateway: Gateway, #[case] name: &str) {
    gateway
        .register("redis", vec![tool("redis_get", "Get a key", &[("key", "string")], &[])])
        .await;

    let result = gateway.service.call_tool(name, json!({})).await;

    assert!(
        matches!(result, Err(FederationError::UnknownTool(_))),
        "expected unknown tool for {name}"
    );
    assert!(gateway.client.calls().expect("calls").is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resources_are_namespaced_and_readable(gateway: Gateway) {
    let files = server("files");
    gateway
        .client
        .set_resources(
            &files,
            vec![BackendResource::new("file:///etc/motd", "motd").expect("valid resource")],
        )
        .expect("resources should be scripted");
    gateway
        .client
        .set_resource_text(&files, "file:///etc/motd", "hello")
        .expect("resource text should be scripted");
    gateway
        .register("files", vec![tool("read_file", "Read a file", &[], &[])])
        .await;

    let resources = gateway
        .service
        .list_resources()
        .await
        .expect("resources should list");
    let uris: Vec<&str> = resources.iter().map(|resource| resource.uri()).collect();
    assert_eq!(uris, vec!["files://file:///etc/motd"]);

    let contents = gateway
        .service
        .read_resource("files://file:///etc/motd")
        .await
        .expect("read should succeed");
    assert_eq!(contents["contents"][0]["text"], json!("hello"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn backends_without_resources_still_register(gateway: Gateway) {
    let registered = gateway
        .register("redis", vec![tool("redis_get", "Get a key", &[], &[])])
        .await;

    assert_eq!(registered.server.resources_count, 0);
    assert_eq!(registered.server.tools_count, 1);
    assert!(
        gateway
            .service
            .list_resources()
            .await
            .expect("resources should list")
            .is_empty()
    );
}

//! Then steps for federation BDD scenarios.

use super::world::{FederationWorld, run_async, server_name, split_list};
use rstest_bdd_macros::then;
use switchboard::federation::{domain::HealthState, services::FederationError};

fn health_of(world: &FederationWorld, name: &str) -> Result<HealthState, eyre::Report> {
    let detail = run_async(world.service.server_detail(name))
        .map_err(|err| eyre::eyre!("server_detail failed: {err}"))?;
    Ok(detail.summary.health)
}

#[then(r#"the catalog lists "{tools}""#)]
fn catalog_lists(world: &mut FederationWorld, tools: String) -> Result<(), eyre::Report> {
    let listed: Vec<String> = run_async(world.service.list_tools())
        .map_err(|err| eyre::eyre!("list_tools failed: {err}"))?
        .iter()
        .map(|tool| tool.name().to_owned())
        .collect();
    let expected = split_list(&tools);
    if listed != expected {
        return Err(eyre::eyre!("expected tools {expected:?}, found {listed:?}"));
    }
    Ok(())
}

#[then(r#""{name}" is unhealthy"#)]
fn backend_is_unhealthy(world: &mut FederationWorld, name: String) -> Result<(), eyre::Report> {
    let health = health_of(world, &name)?;
    if health != HealthState::Unhealthy {
        return Err(eyre::eyre!("expected '{name}' to be unhealthy, found {health}"));
    }
    Ok(())
}

#[then(r#""{name}" is healthy"#)]
fn backend_is_healthy(world: &mut FederationWorld, name: String) -> Result<(), eyre::Report> {
    let health = health_of(world, &name)?;
    if health != HealthState::Healthy {
        return Err(eyre::eyre!("expected '{name}' to be healthy, found {health}"));
    }
    Ok(())
}

#[then(r#"the call reached "{name}" as "{tool}""#)]
fn call_reached(
    world: &mut FederationWorld,
    name: String,
    tool: String,
) -> Result<(), eyre::Report> {
    let expected_server = server_name(&name)?;
    let calls = world.client.calls()?;
    let [call] = calls.as_slice() else {
        return Err(eyre::eyre!("expected one backend call, found {}", calls.len()));
    };
    if call.server != expected_server || call.tool != tool {
        return Err(eyre::eyre!(
            "expected a call to {name} as {tool}, got {} as {}",
            call.server,
            call.tool
        ));
    }
    Ok(())
}

#[then("routing fails with low confidence")]
fn routing_fails_low_confidence(world: &FederationWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_route
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no routed request in scenario world"))?;
    if !matches!(result, Err(FederationError::RoutingLowConfidence { .. })) {
        return Err(eyre::eyre!("expected low confidence, got {result:?}"));
    }
    Ok(())
}

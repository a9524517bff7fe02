//! When steps for federation BDD scenarios.

use super::world::{FederationWorld, run_async, server_name};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use serde_json::json;

#[when("the backends are registered")]
fn register_pending_backends(world: &mut FederationWorld) -> Result<(), eyre::Report> {
    for backend in &world.pending_backends {
        world
            .register(backend)
            .wrap_err_with(|| format!("register backend '{}'", backend.name))?;
    }
    Ok(())
}

#[when(r#""{name}" fails {count:u32} consecutive probes"#)]
fn backend_fails_probes(
    world: &mut FederationWorld,
    name: String,
    count: u32,
) -> Result<(), eyre::Report> {
    world.client.set_unreachable(&server_name(&name)?, true)?;
    for _ in 0..count {
        run_async(world.service.discover(Some(&name))).wrap_err("probe backend")?;
    }
    Ok(())
}

#[when(r#""{name}" answers a probe again"#)]
fn backend_recovers(world: &mut FederationWorld, name: String) -> Result<(), eyre::Report> {
    world.client.set_unreachable(&server_name(&name)?, false)?;
    run_async(world.service.discover(Some(&name))).wrap_err("probe backend")?;
    Ok(())
}

#[when(r#""{tool}" is called"#)]
fn tool_is_called(world: &mut FederationWorld, tool: String) -> Result<(), eyre::Report> {
    run_async(world.service.call_tool(&tool, json!({})))
        .wrap_err_with(|| format!("call '{tool}'"))?;
    Ok(())
}

#[when(r#"the request "{request}" is routed"#)]
fn request_is_routed(world: &mut FederationWorld, request: String) {
    world.last_route = Some(run_async(world.service.route(&request, None)));
}

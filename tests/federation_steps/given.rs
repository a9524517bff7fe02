//! Given steps for federation BDD scenarios.

use super::world::{FederationWorld, PendingBackend, split_list};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a backend "{name}" offering tools "{tools}""#)]
fn a_backend_offering(world: &mut FederationWorld, name: String, tools: String) {
    world.pending_backends.push(PendingBackend {
        name,
        tools: split_list(&tools),
    });
}

#[given(r#"a registered backend "{name}" offering tools "{tools}""#)]
fn a_registered_backend_offering(
    world: &mut FederationWorld,
    name: String,
    tools: String,
) -> Result<(), eyre::Report> {
    let backend = PendingBackend {
        name,
        tools: split_list(&tools),
    };
    world
        .register(&backend)
        .wrap_err_with(|| format!("register backend '{}'", backend.name))
}

//! Shared fixtures for the integration tests.

use anyhow::Context;
use cart_shared::{cart::CartId, physics::PhysicsBackend};
use cart_sim::{sandbox::SandboxBody, SimConfig, Simulation};

/// Installs a test-friendly subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// The built-in demo scene: cart 1 ahead of the player with its handlebar
/// facing them, cart 2 out of reach.
pub fn demo_sim() -> anyhow::Result<Simulation> {
    init_tracing();
    Simulation::new(SimConfig::default())
}

pub fn player_body(sim: &Simulation) -> anyhow::Result<&SandboxBody> {
    sim.world()
        .body(sim.controller().player().body)
        .context("player body")
}

pub fn cart_body(sim: &Simulation, id: u64) -> anyhow::Result<&SandboxBody> {
    let cart = sim
        .controller()
        .carts()
        .get(CartId(id))
        .with_context(|| format!("cart {id}"))?;
    sim.world().body(cart.body).context("cart body")
}

/// Runs console commands in order, failing on the first error.
pub fn exec_all(sim: &mut Simulation, lines: &[&str]) -> anyhow::Result<()> {
    for line in lines {
        sim.exec_console(line)
            .with_context(|| format!("console `{line}`"))?;
    }
    Ok(())
}

//! Player mass must come back exactly after any sequence of grabs and releases.

use cart_shared::{grab::GrabState, physics::RigidBody};
use cart_tests::{cart_body, demo_sim, exec_all, player_body};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

const COMMANDS: &[&str] = &[
    "look 1 body",
    "look 1 handlebar",
    "look 2",
    "grab",
    "grab",
    "release",
    "move 0 1",
    "move 1 0",
    "move 0 0",
    "turn 15",
    "turn -15",
];

#[test]
fn random_sessions_restore_player_mass() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut sim = demo_sim()?;
    let start_mass = player_body(&sim)?.mass();

    for _ in 0..300 {
        let line = COMMANDS.choose(&mut rng).copied().unwrap_or("status");
        exec_all(&mut sim, &[line])?;
        sim.advance(rng.gen_range(0.01..0.08))?;

        let added = sim.controller().session().map_or(0.0, |s| s.mass_added());
        assert_eq!(player_body(&sim)?.mass(), start_mass + added);
    }

    exec_all(&mut sim, &["release"])?;
    sim.advance(0.1)?;
    assert_eq!(sim.controller().state(), GrabState::Free);
    assert_eq!(player_body(&sim)?.mass(), start_mass);

    // Flags are back to plain dynamic bodies.
    for id in [1, 2] {
        let cart = cart_body(&sim, id)?;
        assert!(!cart.is_kinematic());
        assert!(cart.uses_gravity());
    }
    Ok(())
}

#[test]
fn repeated_grab_never_adds_twice() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    let start_mass = player_body(&sim)?.mass();
    exec_all(&mut sim, &["look 1 handlebar", "grab"])?;
    sim.advance(0.1)?;
    for _ in 0..5 {
        exec_all(&mut sim, &["look 1 body", "grab"])?;
        sim.advance(0.1)?;
    }
    assert_eq!(sim.controller().state(), GrabState::PushedByHandlebars);
    assert_eq!(player_body(&sim)?.mass(), start_mass + 25.0);
    Ok(())
}

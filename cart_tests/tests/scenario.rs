//! End-to-end interaction scenarios through the sandbox world.

use cart_shared::{
    cart::CartId,
    event::{ForceSource, InteractionEvent},
    grab::{GrabMode, GrabState},
    math::Vec3,
    outline::has_outline,
    physics::{PhysicsBackend, RigidBody},
};
use cart_tests::{cart_body, demo_sim, exec_all, player_body};

fn outlined(sim: &cart_sim::Simulation, id: u64) -> anyhow::Result<bool> {
    let cart = sim
        .controller()
        .carts()
        .get(CartId(id))
        .ok_or_else(|| anyhow::anyhow!("cart {id}"))?;
    Ok(has_outline(cart))
}

#[test]
fn lift_body_then_release() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    let start_mass = player_body(&sim)?.mass();

    exec_all(&mut sim, &["look 1 body"])?;
    sim.advance(0.1)?;
    assert!(outlined(&sim, 1)?);
    let target = sim.controller().look_target().expect("looking at cart 1");
    assert!(!target.at_handlebar);
    assert!(!target.rollable);

    exec_all(&mut sim, &["grab"])?;
    sim.advance(0.1)?;
    assert_eq!(sim.controller().state(), GrabState::Lifted);
    assert!(!outlined(&sim, 1)?);
    assert_eq!(player_body(&sim)?.mass(), start_mass + 25.0);
    let cart = cart_body(&sim, 1)?;
    assert!(cart.is_kinematic());
    assert!(!cart.uses_gravity());

    // Held one meter along the view ray, level.
    let eye = Vec3::new(0.0, 1.6, 0.0);
    let expected = eye + (Vec3::new(0.0, 0.6, 1.0) - eye).normalize_or_zero();
    assert!((cart.position() - expected).len() < 1e-3);
    assert_eq!(cart.rotation().pitch, 0.0);
    assert_eq!(cart.rotation().roll, 0.0);

    exec_all(&mut sim, &["release"])?;
    sim.advance(1.0)?;
    assert_eq!(sim.controller().state(), GrabState::Free);
    assert_eq!(player_body(&sim)?.mass(), start_mass);
    let cart = cart_body(&sim, 1)?;
    assert!(!cart.is_kinematic());
    assert!(cart.uses_gravity());
    // Dropped back onto the ground.
    assert_eq!(cart.position().y, 0.0);

    let events = sim.drain_events();
    assert!(events.contains(&InteractionEvent::Grabbed {
        cart: CartId(1),
        mode: GrabMode::Lifted,
        fallen_over: false,
    }));
    assert!(events.contains(&InteractionEvent::Released {
        cart: CartId(1),
        mode: GrabMode::Lifted,
    }));
    Ok(())
}

#[test]
fn lifted_cart_rotates_with_scroll() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    exec_all(&mut sim, &["look 1 body", "grab"])?;
    sim.advance(0.02)?;
    let before = cart_body(&sim, 1)?.rotation().yaw;
    exec_all(&mut sim, &["rotate 1"])?;
    sim.advance(0.1)?;
    let after = cart_body(&sim, 1)?.rotation().yaw;
    // 2 degrees per tick at 50 Hz.
    assert!((after - before - 10.0).abs() < 1e-3);
    Ok(())
}

#[test]
fn handlebar_push_follows_player() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    exec_all(&mut sim, &["look 1 handlebar", "grab"])?;
    sim.advance(0.1)?;
    assert_eq!(sim.controller().state(), GrabState::PushedByHandlebars);
    let cart = cart_body(&sim, 1)?;
    assert!(!cart.is_kinematic());
    assert!(cart.uses_gravity());
    assert!((cart.rotation().yaw - 270.0).abs() < 1e-3 || (cart.rotation().yaw + 90.0).abs() < 1e-3);

    // Strafe is ignored while pushing.
    exec_all(&mut sim, &["move 1 1"])?;
    sim.advance(1.0)?;
    let player = player_body(&sim)?;
    assert!(player.position().x.abs() < 1e-3);
    assert!(player.position().z > 2.0);
    assert!(player.linear_velocity().horizontal().len() <= 10.0 + 1e-3);

    let cart = cart_body(&sim, 1)?;
    assert!(cart.position().z > 2.0);
    assert!(cart.position().x.abs() < 0.05);
    Ok(())
}

#[test]
fn outline_follows_view_and_reach() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    exec_all(&mut sim, &["look 1"])?;
    sim.advance(0.1)?;
    assert!(outlined(&sim, 1)?);

    // Cart 2 is beyond grab distance: nothing is targeted.
    exec_all(&mut sim, &["look 2"])?;
    sim.advance(0.1)?;
    assert!(!outlined(&sim, 1)?);
    assert!(!outlined(&sim, 2)?);
    assert!(sim.controller().look_target().is_none());

    exec_all(&mut sim, &["grab"])?;
    sim.advance(0.1)?;
    assert_eq!(sim.controller().state(), GrabState::Free);

    let events = sim.drain_events();
    assert_eq!(
        events,
        vec![
            InteractionEvent::OutlineActivated(CartId(1)),
            InteractionEvent::OutlineDeactivated(CartId(1)),
        ]
    );
    Ok(())
}

#[test]
fn tipped_cart_is_rollable_and_lifts_level() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    let body = sim
        .controller()
        .carts()
        .get(CartId(1))
        .map(|c| c.body)
        .ok_or_else(|| anyhow::anyhow!("cart 1"))?;
    if let Some(b) = sim.world_mut().body_mut(body) {
        b.rotation.roll = 80.0;
    }

    exec_all(&mut sim, &["look 1 handlebar"])?;
    sim.advance(0.1)?;
    let target = sim.controller().look_target().expect("looking at cart 1");
    assert!(target.at_handlebar);
    assert!(target.rollable);
    assert!(target.fallen_over);

    // Rollable wins over the handlebar.
    exec_all(&mut sim, &["grab"])?;
    sim.advance(0.1)?;
    assert_eq!(sim.controller().state(), GrabState::Lifted);
    assert_eq!(cart_body(&sim, 1)?.rotation().roll, 0.0);
    assert!(sim.drain_events().contains(&InteractionEvent::Grabbed {
        cart: CartId(1),
        mode: GrabMode::Lifted,
        fallen_over: true,
    }));
    Ok(())
}

#[test]
fn non_finite_push_is_reported_not_applied() -> anyhow::Result<()> {
    let mut sim = demo_sim()?;
    exec_all(&mut sim, &["look 1 handlebar", "grab"])?;
    sim.advance(0.1)?;
    sim.drain_events();

    let body = sim
        .controller()
        .carts()
        .get(CartId(1))
        .map(|c| c.body)
        .ok_or_else(|| anyhow::anyhow!("cart 1"))?;
    if let Some(b) = sim.world_mut().body_mut(body) {
        b.position = Vec3::new(f32::INFINITY, 0.0, 1.0);
        b.linear_velocity = Vec3::ZERO;
    }
    sim.step(0.02);

    let events = sim.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        InteractionEvent::NonFiniteForce {
            source: ForceSource::PushGuide,
            ..
        }
    )));
    assert!(cart_body(&sim, 1)?.linear_velocity().is_finite());
    assert_eq!(sim.controller().state(), GrabState::PushedByHandlebars);
    Ok(())
}

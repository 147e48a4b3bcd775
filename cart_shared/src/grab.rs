//! Grab/release state machine.
//!
//! States:
//! - `Free`: nothing held, every cart under plain engine physics.
//! - `Lifted`: held cart is (optionally) kinematic, gravity off, snapped to the
//!   lift guide in front of the camera every step, kept level and yawed by the
//!   lift-rotate axis. Velocities are zeroed each step so nothing drifts.
//! - `PushedByHandlebars`: held cart stays dynamic and is pulled towards the
//!   push guide in front of the player body.
//!
//! Grabbing while holding and releasing while free are no-ops. Moving the view
//! ray off a held cart never releases it; only the release input does.
//!
//! The held cart's mass is added to the player body on grab and removed on
//! release, exactly once per session.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    cart::{CartId, CartRegistry},
    config::{GrabConfig, PushResponse, PushSteering},
    event::{EventQueue, ForceSource, InteractionEvent},
    input::InputSnapshot,
    locomotion::{guard_finite, CartSteering},
    look_target::LookTarget,
    math::{normalize_degrees, Euler, Vec3},
    outline,
    physics::{BodyFlags, BodyId, PhysicsBackend, RigidBody},
    player::Player,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrabMode {
    Lifted,
    PushedByHandlebars,
}

/// Observable state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrabState {
    Free,
    Lifted,
    PushedByHandlebars,
}

/// Player-relative frame a held cart tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachFrame {
    #[default]
    None,
    LiftGuide,
    PushGuide,
}

/// Everything about the currently held cart.
#[derive(Debug, Clone, PartialEq)]
pub struct GrabSession {
    pub cart: CartId,
    pub body: BodyId,
    pub mode: GrabMode,
    pub frame: AttachFrame,
    /// Cart yaw relative to the player body.
    pub yaw_offset: f32,
    saved_flags: BodyFlags,
    saved_frame: AttachFrame,
    mass_added: f32,
    /// Player mass right after the add; lets release restore the exact
    /// pre-grab mass when nothing else touched it.
    player_mass_before: f32,
    player_mass_after: f32,
}

impl GrabSession {
    pub fn mass_added(&self) -> f32 {
        self.mass_added
    }

    pub fn saved_flags(&self) -> BodyFlags {
        self.saved_flags
    }
}

/// What [`GrabStateMachine::evaluate`] did this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Grabbed(GrabMode),
    Released(GrabMode),
}

#[derive(Debug, Clone)]
pub struct GrabStateMachine {
    cfg: GrabConfig,
    steering: CartSteering,
    session: Option<GrabSession>,
}

impl GrabStateMachine {
    pub fn new(cfg: GrabConfig, steering: CartSteering) -> Self {
        Self {
            cfg,
            steering,
            session: None,
        }
    }

    pub fn state(&self) -> GrabState {
        match self.session.as_ref().map(|s| s.mode) {
            None => GrabState::Free,
            Some(GrabMode::Lifted) => GrabState::Lifted,
            Some(GrabMode::PushedByHandlebars) => GrabState::PushedByHandlebars,
        }
    }

    pub fn session(&self) -> Option<&GrabSession> {
        self.session.as_ref()
    }

    pub fn is_holding(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_pushing_handlebars(&self) -> bool {
        self.state() == GrabState::PushedByHandlebars
    }

    pub fn held_cart(&self) -> Option<CartId> {
        self.session.as_ref().map(|s| s.cart)
    }

    /// Runs this step's transition. Release wins over grab when both are pressed.
    pub fn evaluate<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        carts: &mut CartRegistry,
        player: &Player,
        target: Option<LookTarget>,
        input: &InputSnapshot,
        events: &mut EventQueue,
    ) -> Transition {
        if input.release {
            return match self.release(physics, player, events) {
                Some(mode) => Transition::Released(mode),
                None => Transition::None,
            };
        }
        match (input.grab, target) {
            (true, Some(target)) => match self.grab(physics, carts, player, target, events) {
                Some(mode) => Transition::Grabbed(mode),
                None => Transition::None,
            },
            _ => Transition::None,
        }
    }

    /// Starts a session on `target`. Ignored while already holding.
    pub fn grab<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        carts: &mut CartRegistry,
        player: &Player,
        target: LookTarget,
        events: &mut EventQueue,
    ) -> Option<GrabMode> {
        if self.session.is_some() {
            debug!(cart = target.cart.0, "grab ignored, already holding");
            return None;
        }
        let cart = carts.get_mut(target.cart)?;
        let cart_body = cart.body;

        let Some((player_pos, player_yaw)) = physics
            .body(player.body)
            .map(|b| (b.position(), b.rotation().yaw))
        else {
            missing(player.body, events);
            return None;
        };

        let mode = if target.rollable || !target.at_handlebar {
            GrabMode::Lifted
        } else {
            GrabMode::PushedByHandlebars
        };

        let Some(body) = physics.body_mut(cart_body) else {
            missing(cart_body, events);
            return None;
        };
        let saved_flags = BodyFlags::capture(body);
        let cart_mass = body.mass();
        let yaw_offset = match mode {
            GrabMode::Lifted => {
                body.set_uses_gravity(false);
                body.set_kinematic(self.cfg.lift_kinematic);
                body.set_linear_velocity(Vec3::ZERO);
                body.set_angular_velocity(Vec3::ZERO);
                normalize_degrees(body.rotation().yaw - player_yaw)
            }
            GrabMode::PushedByHandlebars => {
                body.set_kinematic(false);
                let forward = Euler::from_yaw(player_yaw).flat_forward();
                let snapped = player_pos.horizontal() + forward * self.cfg.distance_when_grabbed;
                let height = body.position().y;
                body.set_position(Vec3::new(snapped.x, height, snapped.z));
                body.set_rotation(Euler::from_yaw(player_yaw + self.cfg.rotate_cart_around));
                body.set_linear_velocity(Vec3::ZERO);
                body.set_angular_velocity(Vec3::ZERO);
                self.cfg.rotate_cart_around
            }
        };

        let Some(pbody) = physics.body_mut(player.body) else {
            missing(player.body, events);
            return None;
        };
        let player_mass_before = pbody.mass();
        let player_mass_after = player_mass_before + cart_mass;
        pbody.set_mass(player_mass_after);

        if outline::deactivate(cart) {
            events.push(InteractionEvent::OutlineDeactivated(target.cart));
        }

        let frame = match mode {
            GrabMode::Lifted => AttachFrame::LiftGuide,
            GrabMode::PushedByHandlebars => AttachFrame::PushGuide,
        };
        self.session = Some(GrabSession {
            cart: target.cart,
            body: cart_body,
            mode,
            frame,
            yaw_offset,
            saved_flags,
            saved_frame: AttachFrame::None,
            mass_added: cart_mass,
            player_mass_before,
            player_mass_after,
        });
        info!(
            cart = target.cart.0,
            ?mode,
            mass = cart_mass,
            fallen_over = target.fallen_over,
            "cart grabbed"
        );
        events.push(InteractionEvent::Grabbed {
            cart: target.cart,
            mode,
            fallen_over: target.fallen_over,
        });
        Some(mode)
    }

    /// Ends the session, restoring the cart's flags and the player's mass.
    /// No-op when nothing is held.
    pub fn release<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        player: &Player,
        events: &mut EventQueue,
    ) -> Option<GrabMode> {
        let session = self.session.take()?;

        match physics.body_mut(session.body) {
            Some(body) => {
                session.saved_flags.restore(body);
                // Detach: the cart keeps its pose, frame goes back to the saved one.
                debug!(cart = session.cart.0, frame = ?session.saved_frame, "detached");
            }
            None => missing(session.body, events),
        }

        match physics.body_mut(player.body) {
            Some(pbody) => {
                let mass = pbody.mass();
                if mass == session.player_mass_after {
                    pbody.set_mass(session.player_mass_before);
                } else {
                    pbody.set_mass(mass - session.mass_added);
                }
            }
            None => missing(player.body, events),
        }

        info!(cart = session.cart.0, mode = ?session.mode, "cart released");
        events.push(InteractionEvent::Released {
            cart: session.cart,
            mode: session.mode,
        });
        Some(session.mode)
    }

    /// Per-step tracking of the held cart.
    pub fn update_held<P: PhysicsBackend>(
        &mut self,
        physics: &mut P,
        carts: &CartRegistry,
        player: &Player,
        input: &InputSnapshot,
        player_force: Vec3,
        events: &mut EventQueue,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(pbody) = physics.body(player.body) else {
            missing(player.body, events);
            return;
        };
        let eye_ray = player.view_ray(pbody);
        let player_pos = pbody.position();
        let player_yaw = pbody.rotation().yaw;

        match session.mode {
            GrabMode::Lifted => {
                session.yaw_offset = normalize_degrees(
                    session.yaw_offset + input.lift_rotate * self.cfg.lift_rotate_degrees_per_tick,
                );
                let guide = eye_ray.at(self.cfg.distance_when_grabbed);
                let Some(body) = physics.body_mut(session.body) else {
                    missing(session.body, events);
                    return;
                };
                if !guide.is_finite() {
                    guard_finite(guide, ForceSource::LiftGuide, events);
                    return;
                }
                body.set_linear_velocity(Vec3::ZERO);
                body.set_angular_velocity(Vec3::ZERO);
                body.set_position(guide);
                body.set_rotation(Euler::from_yaw(player_yaw + session.yaw_offset));
            }
            GrabMode::PushedByHandlebars => match self.cfg.push_steering {
                PushSteering::GuideImpulse => {
                    let forward = Euler::from_yaw(player_yaw).flat_forward();
                    let guide = player_pos + forward * self.cfg.distance_when_grabbed;
                    let target_yaw = player_yaw + session.yaw_offset;
                    push_towards(
                        physics,
                        session.body,
                        guide,
                        target_yaw,
                        self.cfg.push_response,
                        self.cfg.push_turn_gain,
                        events,
                    );
                }
                PushSteering::WheelDrive => {
                    let Some(cart) = carts.get(session.cart) else {
                        return;
                    };
                    let cmd = self.steering.command(player_force);
                    self.steering.drive(physics, cart, cmd, events);
                }
            },
        }
    }
}

/// Guide-seeking velocity change plus a yaw-aligning torque.
fn push_towards<P: PhysicsBackend>(
    physics: &mut P,
    body_id: BodyId,
    guide: Vec3,
    target_yaw: f32,
    response: PushResponse,
    turn_gain: f32,
    events: &mut EventQueue,
) {
    let Some(body) = physics.body_mut(body_id) else {
        missing(body_id, events);
        return;
    };
    let heading = (guide - body.position()).horizontal();
    let delta = match response {
        PushResponse::Lerp { rate, gain } => {
            let current = body.linear_velocity().horizontal();
            current.lerp(heading * gain, rate) - current
        }
        PushResponse::Divisor { divisor } => heading / divisor,
    };
    let yaw_error = normalize_degrees(target_yaw - body.rotation().yaw);
    let torque = Vec3::new(0.0, yaw_error * turn_gain, 0.0);

    // A bad value in either skips the whole tick.
    if !guard_finite(delta, ForceSource::PushGuide, events)
        || !guard_finite(torque, ForceSource::PushTorque, events)
    {
        return;
    }
    body.apply_velocity_change(delta);
    if torque != Vec3::ZERO {
        body.apply_torque(torque);
    }
}

fn missing(body: BodyId, events: &mut EventQueue) {
    warn!(body = body.0, "body missing");
    events.push(InteractionEvent::BodyMissing(body));
}

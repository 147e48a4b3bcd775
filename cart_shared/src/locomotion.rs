//! Locomotion and force model.
//!
//! Input axes become a player-space velocity change each fixed step. While a
//! cart is pushed by its handlebars the strafe component is dropped: carts have
//! no four-wheel steering, so sideways motion only comes from cart turning.
//!
//! Every force passes [`guard_finite`] before it reaches the physics backend.

use tracing::warn;

use crate::{
    cart::Cart,
    config::{CartConfig, MovementConfig},
    event::{EventQueue, ForceSource, InteractionEvent},
    input::InputSnapshot,
    math::Vec3,
    physics::{PhysicsBackend, RigidBody},
};

/// Returns true when `force` may be applied. Otherwise reports it and returns false.
pub fn guard_finite(force: Vec3, source: ForceSource, events: &mut EventQueue) -> bool {
    if force.is_finite() {
        return true;
    }
    warn!(?source, x = force.x, y = force.y, z = force.z, "skipping non-finite force");
    events.push(InteractionEvent::NonFiniteForce { source, force });
    false
}

#[derive(Debug, Clone)]
pub struct Locomotion {
    movement_force: f32,
    velocity_limit: f32,
}

impl Locomotion {
    pub fn new(cfg: &MovementConfig) -> Self {
        Self {
            movement_force: cfg.movement_force,
            velocity_limit: cfg.velocity_limit,
        }
    }

    /// Player-space force for this step: `x` strafe, `z` forward. Zero without input.
    pub fn compute_force(&self, input: &InputSnapshot, dt_sec: f32) -> Vec3 {
        if !input.has_movement() {
            return Vec3::ZERO;
        }
        input.wish_vector() * (self.movement_force * dt_sec)
    }

    /// The part of `force` the player body receives.
    pub fn force_on_player(force: Vec3, pushing_handlebars: bool) -> Vec3 {
        if pushing_handlebars {
            Vec3::new(0.0, 0.0, force.z)
        } else {
            force
        }
    }

    /// Applies a player-space force as a velocity change, rotated by body yaw.
    /// Returns whether a physics call was made.
    pub fn apply<B: RigidBody + ?Sized>(
        &self,
        body: &mut B,
        local_force: Vec3,
        events: &mut EventQueue,
    ) -> bool {
        if !guard_finite(local_force, ForceSource::PlayerLocomotion, events) {
            return false;
        }
        if local_force == Vec3::ZERO {
            return false;
        }
        let world = local_force.rotate_yaw(body.rotation().yaw);
        body.apply_velocity_change(world);
        true
    }

    /// Caps horizontal speed at the velocity limit. Vertical velocity is kept.
    pub fn clamp_velocity<B: RigidBody + ?Sized>(&self, body: &mut B) {
        let v = body.linear_velocity();
        let horizontal = v.horizontal();
        if horizontal.len_sq() <= self.velocity_limit * self.velocity_limit {
            return;
        }
        let clamped = horizontal.clamp_len(self.velocity_limit);
        body.set_linear_velocity(Vec3::new(clamped.x, v.y, clamped.z));
    }

    pub fn velocity_limit(&self) -> f32 {
        self.velocity_limit
    }
}

/// Wheel drive command derived from the player's force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelCommand {
    pub motor_torque: f32,
    /// Steer angle in degrees, applied to the front pair only.
    pub steer_angle: f32,
}

/// Handlebar steering through wheel colliders.
#[derive(Debug, Clone)]
pub struct CartSteering {
    min_turn_angle: f32,
    max_turn_angle: f32,
    torque_scale: f32,
}

impl CartSteering {
    pub fn new(cfg: &CartConfig) -> Self {
        Self {
            min_turn_angle: cfg.min_turn_angle,
            max_turn_angle: cfg.max_turn_angle,
            torque_scale: cfg.wheel_torque_scale,
        }
    }

    /// Turn angle in degrees for a pushing (forward) and turning (lateral) force.
    ///
    /// The magnitude comes from `atan2(|turning|, |pushing|)` clamped to the
    /// configured range; the sign is negative when the forces have opposite
    /// signs, so reversing keeps the turn direction of the handlebars.
    pub fn turn_angle(&self, pushing: f32, turning: f32) -> f32 {
        if turning == 0.0 {
            return 0.0;
        }
        let angle = turning
            .abs()
            .atan2(pushing.abs())
            .to_degrees()
            .clamp(self.min_turn_angle, self.max_turn_angle);
        if turning * pushing < 0.0 {
            -angle
        } else {
            angle
        }
    }

    pub fn command(&self, player_force: Vec3) -> WheelCommand {
        let pushing = player_force.z;
        let turning = player_force.x;
        WheelCommand {
            motor_torque: pushing * self.torque_scale,
            steer_angle: self.turn_angle(pushing, turning),
        }
    }

    /// Uniform torque to every wheel, steer angle to the front two.
    pub fn drive<P: PhysicsBackend>(
        &self,
        physics: &mut P,
        cart: &Cart,
        cmd: WheelCommand,
        events: &mut EventQueue,
    ) -> bool {
        let packed = Vec3::new(cmd.motor_torque, 0.0, cmd.steer_angle);
        if !guard_finite(packed, ForceSource::WheelDrive, events) {
            return false;
        }
        let front = cart.front_wheels();
        for wheel in 0..cart.wheels.len() {
            let steer = if front.contains(&wheel) {
                cmd.steer_angle
            } else {
                0.0
            };
            physics.drive_wheel(cart.body, wheel, cmd.motor_torque, steer);
        }
        true
    }
}

//! Physics collaborator contracts.
//!
//! Rigid-body integration, collision and ray casting are provided by a host
//! engine. The interaction core only talks to it through [`PhysicsBackend`]
//! and [`RigidBody`].

use serde::{Deserialize, Serialize};

use crate::math::{Euler, Ray, Vec3};

/// Opaque rigid-body id owned by the physics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

bitflags::bitflags! {
    /// Collision layers used to filter ray casts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LayerMask: u32 {
        const NONE = 0;
        const DEFAULT = 1 << 0;
        const GROUND = 1 << 1;
        const PLAYER = 1 << 2;
        const INTERACTABLE = 1 << 3;  // Carts
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tag carried by a collider; distinguishes graspable sub-regions of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ColliderTag {
    #[default]
    Untagged,
    Body,
    Handlebar,
}

/// Result of a ray cast. Only produced on a hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub tag: ColliderTag,
}

/// Per-body control surface exposed by the host engine.
pub trait RigidBody {
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);

    fn rotation(&self) -> Euler;
    fn set_rotation(&mut self, rotation: Euler);

    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);

    /// Angular velocity in degrees per second.
    fn angular_velocity(&self) -> Vec3;
    fn set_angular_velocity(&mut self, velocity: Vec3);

    fn mass(&self) -> f32;
    fn set_mass(&mut self, mass: f32);

    fn is_kinematic(&self) -> bool;
    fn set_kinematic(&mut self, kinematic: bool);

    fn uses_gravity(&self) -> bool;
    fn set_uses_gravity(&mut self, enabled: bool);

    /// Mass-independent world-space velocity change.
    fn apply_velocity_change(&mut self, delta: Vec3);

    /// World-space torque.
    fn apply_torque(&mut self, torque: Vec3);
}

/// Physics world capability consumed by the interaction core.
pub trait PhysicsBackend {
    type Body: RigidBody;

    fn body(&self, id: BodyId) -> Option<&Self::Body>;
    fn body_mut(&mut self, id: BodyId) -> Option<&mut Self::Body>;

    /// Casts `ray` against colliders on `layers`, returning the nearest hit
    /// within `max_distance`.
    fn raycast(&self, ray: &Ray, max_distance: f32, layers: LayerMask) -> Option<RayHit>;

    /// Whether wheel `wheel` of `body` currently touches the ground.
    fn wheel_grounded(&self, body: BodyId, wheel: usize) -> bool;

    /// Pushes wheel drive commands to the engine's wheel colliders.
    fn drive_wheel(&mut self, body: BodyId, wheel: usize, motor_torque: f32, steer_angle: f32);
}

/// Pre-grab body flags, captured so release restores them exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyFlags {
    pub kinematic: bool,
    pub uses_gravity: bool,
}

impl BodyFlags {
    pub fn capture<B: RigidBody + ?Sized>(body: &B) -> Self {
        Self {
            kinematic: body.is_kinematic(),
            uses_gravity: body.uses_gravity(),
        }
    }

    pub fn restore<B: RigidBody + ?Sized>(self, body: &mut B) {
        body.set_kinematic(self.kinematic);
        body.set_uses_gravity(self.uses_gravity);
    }
}

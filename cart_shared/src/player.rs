//! Player state owned by the controller.
//!
//! Position, yaw and velocity live on the player's rigid body. The player
//! struct holds what the physics engine does not: camera pitch and the force
//! computed for the current fixed step.

use crate::{
    math::{Euler, Ray, Vec3},
    physics::{BodyId, RigidBody},
};

#[derive(Debug, Clone)]
pub struct Player {
    pub body: BodyId,
    /// Camera pitch in degrees, always within the configured limit.
    pub(crate) pitch: f32,
    /// Player-local force computed from input this step, before strafe suppression.
    pub(crate) force_to_apply: Vec3,
    pub(crate) velocity_limit: f32,
    eye_height: f32,
}

impl Player {
    pub fn new(body: BodyId, velocity_limit: f32, eye_height: f32) -> Self {
        Self {
            body,
            pitch: 0.0,
            force_to_apply: Vec3::ZERO,
            velocity_limit,
            eye_height,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// The force most recently computed from movement input, in player space.
    pub fn force_to_apply(&self) -> Vec3 {
        self.force_to_apply
    }

    pub fn velocity_limit(&self) -> f32 {
        self.velocity_limit
    }

    pub fn eye_position<B: RigidBody + ?Sized>(&self, body: &B) -> Vec3 {
        body.position() + Vec3::UP * self.eye_height
    }

    /// Camera orientation: body yaw plus camera pitch.
    pub fn view_rotation<B: RigidBody + ?Sized>(&self, body: &B) -> Euler {
        Euler {
            pitch: self.pitch,
            yaw: body.rotation().yaw,
            roll: 0.0,
        }
    }

    /// Ray from the eye along the view direction.
    pub fn view_ray<B: RigidBody + ?Sized>(&self, body: &B) -> Ray {
        Ray::new(self.eye_position(body), self.view_rotation(body).forward())
    }
}

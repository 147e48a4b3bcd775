//! Rollability sensor.
//!
//! Ground contact changes every physics step, so these are queried fresh each
//! fixed step and never cached.

use crate::{
    cart::Cart,
    config::CartConfig,
    math::{normalize_degrees, Euler},
    physics::PhysicsBackend,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollabilitySensor {
    pub threshold: usize,
    pub fallen_over_degrees: f32,
}

impl RollabilitySensor {
    pub fn from_config(cfg: &CartConfig) -> Self {
        Self {
            threshold: cfg.rollable_wheel_threshold,
            fallen_over_degrees: cfg.fallen_over_degrees,
        }
    }

    /// Number of the cart's wheels without ground contact.
    pub fn airborne_wheels<P: PhysicsBackend>(&self, physics: &P, cart: &Cart) -> usize {
        (0..cart.wheels.len())
            .filter(|&i| !physics.wheel_grounded(cart.body, i))
            .count()
    }

    pub fn is_rollable_count(&self, airborne: usize) -> bool {
        airborne >= self.threshold
    }

    /// True when at least `threshold` wheels are off the ground.
    pub fn is_rollable<P: PhysicsBackend>(&self, physics: &P, cart: &Cart) -> bool {
        self.is_rollable_count(self.airborne_wheels(physics, cart))
    }

    /// Pitch or roll past the configured tipping angle.
    pub fn is_fallen_over(&self, rotation: Euler) -> bool {
        let limit = self.fallen_over_degrees;
        normalize_degrees(rotation.pitch).abs() >= limit
            || normalize_degrees(rotation.roll).abs() >= limit
    }
}

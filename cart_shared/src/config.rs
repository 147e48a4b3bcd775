//! Configuration system.
//!
//! Tuning values for the interaction core, loaded from JSON strings (file IO
//! left to the app). Every field has a default so partial documents are valid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::physics::LayerMask;

/// Root configuration for the player/cart controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ControllerConfig {
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub look: LookConfig,
    #[serde(default)]
    pub grab: GrabConfig,
    #[serde(default)]
    pub cart: CartConfig,
}

/// Player translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Force applied per unit of input axis, before scaling by tick duration.
    pub movement_force: f32,
    /// Horizontal speed ceiling in m/s.
    pub velocity_limit: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            movement_force: 50.0,
            velocity_limit: 10.0,
        }
    }
}

/// Camera rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    pub mouse_sensitivity: f32,
    pub gamepad_sensitivity: f32,
    /// Gamepad axis magnitudes at or below this are treated as idle.
    pub gamepad_deadzone: f32,
    /// Pitch is clamped to +/- this many degrees.
    pub pitch_limit: f32,
    /// View origin above the player body position.
    pub eye_height: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 20.0,
            gamepad_sensitivity: 100.0,
            gamepad_deadzone: 0.05,
            pitch_limit: 90.0,
            eye_height: 1.6,
        }
    }
}

/// How strongly a handlebar-pushed cart is pulled towards its guide point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PushResponse {
    /// Blend the cart's horizontal velocity towards `heading * gain` by `rate`
    /// each tick. Faster carts receive proportionally smaller corrections.
    Lerp { rate: f32, gain: f32 },
    /// Velocity change is `heading / divisor` each tick.
    Divisor { divisor: f32 },
}

impl Default for PushResponse {
    fn default() -> Self {
        Self::Lerp {
            rate: 0.25,
            gain: 8.0,
        }
    }
}

/// Which model steers a handlebar-pushed cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PushSteering {
    /// Velocity impulses towards the push guide plus a yaw-aligning torque.
    #[default]
    GuideImpulse,
    /// Motor torque on all wheels and steer angle on the front pair.
    WheelDrive,
}

/// Grabbing, lifting and pushing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Look ray length in meters.
    pub max_distance_grab: f32,
    /// Distance in front of the player at which a held cart is kept.
    pub distance_when_grabbed: f32,
    /// Yaw offset applied to a handlebar-grabbed cart relative to the player.
    pub rotate_cart_around: f32,
    /// Yaw degrees per tick per unit of the lift-rotate axis.
    pub lift_rotate_degrees_per_tick: f32,
    /// Whether a lifted cart is made kinematic.
    pub lift_kinematic: bool,
    pub push_response: PushResponse,
    pub push_steering: PushSteering,
    /// Torque per degree of yaw error while pushing.
    pub push_turn_gain: f32,
    /// Layers the look ray may hit.
    pub interactable_layer: LayerMask,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            max_distance_grab: 1.0,
            distance_when_grabbed: 1.0,
            rotate_cart_around: -90.0,
            lift_rotate_degrees_per_tick: 2.0,
            lift_kinematic: true,
            push_response: PushResponse::default(),
            push_steering: PushSteering::default(),
            push_turn_gain: 0.5,
            interactable_layer: LayerMask::INTERACTABLE,
        }
    }
}

/// Cart sensing and wheel drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Airborne wheel count at which a cart counts as rollable.
    pub rollable_wheel_threshold: usize,
    /// Pitch or roll beyond this many degrees means the cart has fallen over.
    pub fallen_over_degrees: f32,
    pub min_turn_angle: f32,
    pub max_turn_angle: f32,
    /// Wheel motor torque per unit of pushing force.
    pub wheel_torque_scale: f32,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            rollable_wheel_threshold: 2,
            fallen_over_degrees: 45.0,
            min_turn_angle: 0.0,
            max_turn_angle: 35.0,
            wheel_torque_scale: 10.0,
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NotFinite(&'static str),
    Negative(&'static str),
    InvertedRange {
        min: &'static str,
        max: &'static str,
    },
    ZeroDivisor,
    AboveLimit {
        field: &'static str,
        limit: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFinite(field) => write!(f, "{field} must be finite"),
            ConfigError::Negative(field) => write!(f, "{field} must not be negative"),
            ConfigError::InvertedRange { min, max } => {
                write!(f, "{min} must not exceed {max}")
            }
            ConfigError::ZeroDivisor => write!(f, "push divisor must be non-zero"),
            ConfigError::AboveLimit { field, limit } => {
                write!(f, "{field} must not exceed {limit}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite(name));
    }
    if value < 0.0 {
        return Err(ConfigError::Negative(name));
    }
    Ok(())
}

fn at_most(name: &'static str, value: f32, limit: f32) -> Result<(), ConfigError> {
    if value > limit {
        return Err(ConfigError::AboveLimit { field: name, limit });
    }
    Ok(())
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite(name))
    }
}

impl ControllerConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Checks magnitudes and ranges. Called once at controller construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.movement;
        non_negative("movement.movement_force", m.movement_force)?;
        non_negative("movement.velocity_limit", m.velocity_limit)?;

        let l = &self.look;
        non_negative("look.mouse_sensitivity", l.mouse_sensitivity)?;
        non_negative("look.gamepad_sensitivity", l.gamepad_sensitivity)?;
        non_negative("look.gamepad_deadzone", l.gamepad_deadzone)?;
        non_negative("look.pitch_limit", l.pitch_limit)?;
        finite("look.eye_height", l.eye_height)?;

        let g = &self.grab;
        non_negative("grab.max_distance_grab", g.max_distance_grab)?;
        non_negative("grab.distance_when_grabbed", g.distance_when_grabbed)?;
        finite("grab.rotate_cart_around", g.rotate_cart_around)?;
        finite("grab.lift_rotate_degrees_per_tick", g.lift_rotate_degrees_per_tick)?;
        non_negative("grab.push_turn_gain", g.push_turn_gain)?;
        match g.push_response {
            PushResponse::Lerp { rate, gain } => {
                non_negative("grab.push_response.rate", rate)?;
                at_most("grab.push_response.rate", rate, 1.0)?;
                non_negative("grab.push_response.gain", gain)?;
            }
            PushResponse::Divisor { divisor } => {
                finite("grab.push_response.divisor", divisor)?;
                if divisor == 0.0 {
                    return Err(ConfigError::ZeroDivisor);
                }
            }
        }

        let c = &self.cart;
        non_negative("cart.fallen_over_degrees", c.fallen_over_degrees)?;
        finite("cart.min_turn_angle", c.min_turn_angle)?;
        finite("cart.max_turn_angle", c.max_turn_angle)?;
        // No turn input means straight wheels, so the range has to admit zero.
        at_most("cart.min_turn_angle", c.min_turn_angle, 0.0)?;
        finite("cart.wheel_torque_scale", c.wheel_torque_scale)?;
        if c.min_turn_angle > c.max_turn_angle {
            return Err(ConfigError::InvertedRange {
                min: "cart.min_turn_angle",
                max: "cart.max_turn_angle",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = ControllerConfig::from_json_str(
            r#"{ "movement": { "velocity_limit": 4.0 },
                 "grab": { "push_response": { "kind": "divisor", "divisor": 2.0 } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.movement.velocity_limit, 4.0);
        assert_eq!(cfg.movement.movement_force, 50.0);
        assert_eq!(cfg.grab.push_response, PushResponse::Divisor { divisor: 2.0 });
        assert_eq!(cfg.cart.rollable_wheel_threshold, 2);
    }

    #[test]
    fn rejects_inverted_turn_range() {
        let mut cfg = ControllerConfig::default();
        cfg.cart.min_turn_angle = -10.0;
        cfg.cart.max_turn_angle = -20.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn rejects_turn_range_without_zero() {
        let mut cfg = ControllerConfig::default();
        cfg.cart.min_turn_angle = 5.0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::AboveLimit {
                field: "cart.min_turn_angle",
                limit: 0.0,
            })
        );
    }

    #[test]
    fn rejects_lerp_rate_above_one() {
        let mut cfg = ControllerConfig::default();
        cfg.grab.push_response = PushResponse::Lerp { rate: 1.5, gain: 1.0 };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::AboveLimit {
                field: "grab.push_response.rate",
                limit: 1.0,
            })
        );

        cfg.grab.push_response = PushResponse::Lerp { rate: 1.0, gain: 1.0 };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_divisor_and_nan() {
        let mut cfg = ControllerConfig::default();
        cfg.grab.push_response = PushResponse::Divisor { divisor: 0.0 };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDivisor));

        let mut cfg = ControllerConfig::default();
        cfg.movement.movement_force = f32::NAN;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotFinite("movement.movement_force"))
        );
    }
}

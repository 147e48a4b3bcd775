//! Runner configuration.
//!
//! Loaded from a JSON file given with `--config`; CLI flags override the file.

use std::path::Path;

use anyhow::Context;
use cart_shared::{config::ControllerConfig, math::Vec3};
use serde::{Deserialize, Serialize};

/// Sandbox physics parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_gravity")]
    pub gravity: Vec3,
    /// Horizontal velocity lost per second while touching the ground.
    #[serde(default = "default_ground_friction")]
    pub ground_friction: f32,
    /// Angular velocity lost per second.
    #[serde(default = "default_angular_damping")]
    pub angular_damping: f32,
}

fn default_gravity() -> Vec3 {
    Vec3::new(0.0, -9.81, 0.0)
}

fn default_ground_friction() -> f32 {
    4.0
}

fn default_angular_damping() -> f32 {
    2.0
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            ground_friction: default_ground_friction(),
            angular_damping: default_angular_damping(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed physics rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Input/camera rate.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    /// Scene description; the built-in demo scene when absent.
    #[serde(default)]
    pub scene: Option<String>,
    #[serde(default)]
    pub physics: SandboxConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

fn default_tick_hz() -> u32 {
    50
}

fn default_frame_hz() -> u32 {
    60
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            frame_hz: default_frame_hz(),
            scene: None,
            physics: SandboxConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1) as f32
    }

    pub fn frame_dt(&self) -> f32 {
        1.0 / self.frame_hz.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = SimConfig::from_json_str(r#"{ "tick_hz": 100, "controller": { "look": { "mouse_sensitivity": 5.0 } } }"#)
            .unwrap();
        assert_eq!(cfg.tick_hz, 100);
        assert_eq!(cfg.frame_hz, 60);
        assert_eq!(cfg.controller.look.mouse_sensitivity, 5.0);
        assert_eq!(cfg.controller.look.pitch_limit, 90.0);
        assert_eq!(cfg.physics.gravity.y, -9.81);
    }

    #[test]
    fn zero_rates_do_not_divide_by_zero() {
        let cfg = SimConfig {
            tick_hz: 0,
            frame_hz: 0,
            ..Default::default()
        };
        assert_eq!(cfg.tick_dt(), 1.0);
        assert_eq!(cfg.frame_dt(), 1.0);
    }
}

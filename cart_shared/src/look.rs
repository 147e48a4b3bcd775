//! Look/camera rotation model.
//!
//! Pitch belongs to the camera and is clamped; yaw is applied to the player
//! body and is unbounded (wrapped to [0, 360)).
//!
//! The accumulated pitch is normalised into [-180, 180] before clamping.
//! Clamping the raw [0, 360) angle directly makes the view snap between the
//! two limits near straight down.

use crate::{
    config::LookConfig,
    input::LookAxes,
    math::{normalize_degrees, wrap_degrees},
};

/// Rotation to apply this frame, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LookDelta {
    pub pitch: f32,
    pub yaw: f32,
}

#[derive(Debug, Clone)]
pub struct LookModel {
    cfg: LookConfig,
}

impl LookModel {
    pub fn new(cfg: LookConfig) -> Self {
        Self { cfg }
    }

    /// Picks the gamepad axis when it is outside the deadzone, else the mouse.
    pub fn resolve_axis(&self, mouse: f32, gamepad: f32) -> f32 {
        let magnitude = gamepad.abs();
        if magnitude <= 1.0 && magnitude > self.cfg.gamepad_deadzone {
            gamepad * self.cfg.gamepad_sensitivity
        } else {
            mouse * self.cfg.mouse_sensitivity
        }
    }

    /// Frame rotation from raw axes. Moving the look axis up pitches the view up.
    pub fn delta(&self, axes: LookAxes, dt_sec: f32) -> LookDelta {
        LookDelta {
            pitch: -self.resolve_axis(axes.mouse_y, axes.gamepad_y) * dt_sec,
            yaw: self.resolve_axis(axes.mouse_x, axes.gamepad_x) * dt_sec,
        }
    }

    /// Normalises then clamps a raw pitch to the configured limit.
    pub fn clamp_pitch(&self, raw: f32) -> f32 {
        let limit = self.cfg.pitch_limit;
        normalize_degrees(raw).clamp(-limit, limit)
    }

    /// Returns the new `(pitch, yaw)` after applying `delta`.
    pub fn apply(&self, pitch: f32, yaw: f32, delta: LookDelta) -> (f32, f32) {
        (
            self.clamp_pitch(pitch + delta.pitch),
            wrap_degrees(yaw + delta.yaw),
        )
    }
}

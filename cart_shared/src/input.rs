//! Input handling.
//!
//! Input polling belongs to the host. The core only sees an [`InputSnapshot`]
//! sampled once per rendered frame through an [`InputSource`].

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Raw look axes from both devices. The look model decides which one wins.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LookAxes {
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub gamepad_x: f32,
    pub gamepad_y: f32,
}

impl LookAxes {
    pub fn mouse(x: f32, y: f32) -> Self {
        Self {
            mouse_x: x,
            mouse_y: y,
            ..Default::default()
        }
    }
}

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub grab: bool,
    pub release: bool,
    /// Sideways movement axis in [-1, 1], positive is right.
    pub strafe: f32,
    /// Forward movement axis in [-1, 1].
    pub forward: f32,
    pub look: LookAxes,
    /// Yaw input for a lifted cart (scroll wheel).
    pub lift_rotate: f32,
}

impl InputSnapshot {
    /// Player-local movement intent; `x` strafe, `z` forward.
    pub fn wish_vector(self) -> Vec3 {
        Vec3::new(self.strafe, 0.0, self.forward)
    }

    pub fn has_movement(self) -> bool {
        self.strafe != 0.0 || self.forward != 0.0
    }
}

/// Anything that can be polled for the current input state.
pub trait InputSource {
    fn sample(&mut self) -> InputSnapshot;
}

/// Fixed input, useful for headless runs.
impl InputSource for InputSnapshot {
    fn sample(&mut self) -> InputSnapshot {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wish_vector_maps_axes() {
        let input = InputSnapshot {
            strafe: -1.0,
            forward: 0.5,
            ..Default::default()
        };
        assert_eq!(input.wish_vector(), Vec3::new(-1.0, 0.0, 0.5));
        assert!(input.has_movement());
        assert!(!InputSnapshot::default().has_movement());
    }
}

//! `cart_shared`
//!
//! Interaction and movement core for a first-person cart game: look-target
//! resolution, outline highlighting, the grab/release state machine, locomotion
//! and camera rotation. The host engine is reached only through the traits in
//! [`physics`] and [`input`].
//!
//! Design goals:
//! - Engine-agnostic: no rendering, audio or scene graph types.
//! - One owner for grab state ([`grab::GrabStateMachine`]).
//! - Never feed non-finite values to the physics backend.
//! - No `unsafe`.

pub mod cart;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod grab;
pub mod input;
pub mod locomotion;
pub mod look;
pub mod look_target;
pub mod math;
pub mod outline;
pub mod physics;
pub mod player;
pub mod rollability;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::cart::*;
    pub use crate::config::*;
    pub use crate::controller::CartController;
    pub use crate::error::SetupError;
    pub use crate::event::*;
    pub use crate::grab::{GrabMode, GrabState};
    pub use crate::input::*;
    pub use crate::math::*;
    pub use crate::physics::*;
}

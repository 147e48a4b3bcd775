//! `cart_sim`
//!
//! Headless host for the cart interaction core:
//! - Sandbox rigid-body world implementing the physics collaborator traits
//! - Scene descriptions (player plus carts) loaded from JSON
//! - Fixed timestep runner with a separate frame cadence
//! - Console commands standing in for input devices

pub mod config;
pub mod sandbox;
pub mod scene;
pub mod sim;

pub use config::SimConfig;
pub use sim::Simulation;

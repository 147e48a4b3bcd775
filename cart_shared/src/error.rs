//! Setup errors.
//!
//! Missing collaborators are configuration faults: they are reported once when
//! the controller is built, never checked for on the per-tick path.

use std::fmt;

use crate::{cart::CartId, config::ConfigError, physics::BodyId};

#[derive(Debug, Clone, PartialEq)]
pub enum SetupError {
    /// The physics backend has no body with this id.
    MissingBody(BodyId),
    DuplicateCart(CartId),
    /// Two carts (or a cart and the player) share a body.
    DuplicateBody(BodyId),
    /// Carts need at least the two front wheels.
    TooFewWheels { cart: CartId, wheels: usize },
    UnknownCart(CartId),
    SelfLink(CartId),
    Config(ConfigError),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::MissingBody(id) => write!(f, "physics body {} not found", id.0),
            SetupError::DuplicateCart(id) => write!(f, "cart {} registered twice", id.0),
            SetupError::DuplicateBody(id) => write!(f, "body {} is already in use", id.0),
            SetupError::TooFewWheels { cart, wheels } => {
                write!(f, "cart {} has {} wheels, need at least 2", cart.0, wheels)
            }
            SetupError::UnknownCart(id) => write!(f, "unknown cart {}", id.0),
            SetupError::SelfLink(id) => write!(f, "cart {} cannot be linked to itself", id.0),
            SetupError::Config(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SetupError {
    fn from(e: ConfigError) -> Self {
        SetupError::Config(e)
    }
}

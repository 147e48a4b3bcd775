//! Interaction events.
//!
//! Components queue events during a fixed step; the host drains them once per
//! step (UI prompts, audio cues, diagnostics). Nothing in the core reads them.

use crate::{cart::CartId, grab::GrabMode, math::Vec3, physics::BodyId};

/// Which computation produced a rejected force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceSource {
    PlayerLocomotion,
    LiftGuide,
    PushGuide,
    PushTorque,
    WheelDrive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    OutlineActivated(CartId),
    OutlineDeactivated(CartId),
    Grabbed {
        cart: CartId,
        mode: GrabMode,
        fallen_over: bool,
    },
    Released {
        cart: CartId,
        mode: GrabMode,
    },
    /// A computed force had a NaN/Inf component and was not applied.
    NonFiniteForce { source: ForceSource, force: Vec3 },
    /// A body that existed at setup was not found during a step.
    BodyMissing(BodyId),
}

/// Per-step event queue.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<InteractionEvent>,
}

impl EventQueue {
    pub fn push(&mut self, e: InteractionEvent) {
        self.events.push(e);
    }

    /// Drains all queued events in emission order.
    pub fn drain(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count_where(&self, f: impl Fn(&InteractionEvent) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

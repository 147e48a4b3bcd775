//! Outline controller.
//!
//! Adds or removes a cart's highlight material across all of its visual parts.
//! Both directions are idempotent: the cart's `outlined` flag mirrors whether
//! the highlight is currently applied.

use tracing::debug;

use crate::cart::{Cart, Material, MaterialSlots};

/// Appends the highlight material to every part. No-op when already outlined.
/// Returns whether anything changed.
pub fn activate(cart: &mut Cart) -> bool {
    if cart.outlined {
        return false;
    }
    cart.outlined = true;
    let highlight = cart.outline_material.clone();
    for part in &mut cart.parts {
        add_to(part, &highlight);
    }
    debug!(cart = cart.id.0, "outline on");
    true
}

/// Removes every occurrence of the highlight shader from every part. No-op
/// when not outlined. Returns whether anything changed.
pub fn deactivate(cart: &mut Cart) -> bool {
    if !cart.outlined {
        return false;
    }
    cart.outlined = false;
    let highlight = cart.outline_material.clone();
    for part in &mut cart.parts {
        remove_from(part, &highlight);
    }
    debug!(cart = cart.id.0, "outline off");
    true
}

pub fn has_outline(cart: &Cart) -> bool {
    cart.outlined
}

fn add_to<P: MaterialSlots>(part: &mut P, highlight: &Material) {
    let mut materials = part.materials().to_vec();
    materials.push(highlight.clone());
    part.set_materials(materials);
}

fn remove_from<P: MaterialSlots>(part: &mut P, highlight: &Material) {
    let materials: Vec<Material> = part
        .materials()
        .iter()
        .filter(|m| m.shader != highlight.shader)
        .cloned()
        .collect();
    part.set_materials(materials);
}

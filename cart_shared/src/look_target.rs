//! Look-target resolver.
//!
//! Casts the view ray once per fixed step and decides which cart, if any, the
//! player is looking at. Also owns outline bookkeeping for looked-at carts:
//! the cart under the ray is outlined while nothing is held, and a cart loses
//! its outline as soon as the ray leaves it.

use tracing::trace;

use crate::{
    cart::{CartId, CartRegistry},
    event::{EventQueue, InteractionEvent},
    math::{Ray, Vec3},
    outline,
    physics::{ColliderTag, LayerMask, PhysicsBackend, RigidBody},
    rollability::RollabilitySensor,
};

/// What the view ray hit this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookTarget {
    pub cart: CartId,
    pub at_handlebar: bool,
    pub rollable: bool,
    pub fallen_over: bool,
    pub point: Vec3,
}

#[derive(Debug, Clone)]
pub struct LookTargetResolver {
    max_distance: f32,
    layers: LayerMask,
    sensor: RollabilitySensor,
    current: Option<LookTarget>,
    last_looked_at: Option<CartId>,
}

impl LookTargetResolver {
    pub fn new(max_distance: f32, layers: LayerMask, sensor: RollabilitySensor) -> Self {
        Self {
            max_distance,
            layers,
            sensor,
            current: None,
            last_looked_at: None,
        }
    }

    /// The target computed by the most recent [`resolve`](Self::resolve).
    pub fn current(&self) -> Option<LookTarget> {
        self.current
    }

    pub fn last_looked_at(&self) -> Option<CartId> {
        self.last_looked_at
    }

    /// Recomputes the look target and updates outlines.
    pub fn resolve<P: PhysicsBackend>(
        &mut self,
        physics: &P,
        carts: &mut CartRegistry,
        view_ray: &Ray,
        holding: bool,
        events: &mut EventQueue,
    ) -> Option<LookTarget> {
        // Hits on non-cart bodies sharing the layer count as misses.
        let hit = physics
            .raycast(view_ray, self.max_distance, self.layers)
            .and_then(|hit| carts.by_body(hit.body).map(|cart| (cart, hit)));

        let Some((cart_id, hit)) = hit else {
            if let Some(prev) = self.last_looked_at.take() {
                deactivate(carts, prev, events);
            }
            self.current = None;
            return None;
        };

        if let Some(prev) = self.last_looked_at {
            if prev != cart_id {
                deactivate(carts, prev, events);
            }
        }
        self.last_looked_at = Some(cart_id);

        let Some(cart) = carts.get_mut(cart_id) else {
            self.current = None;
            return None;
        };
        if !holding && outline::activate(cart) {
            events.push(InteractionEvent::OutlineActivated(cart_id));
        }

        let fallen_over = physics
            .body(cart.body)
            .map(|b| self.sensor.is_fallen_over(b.rotation()))
            .unwrap_or(false);
        let target = LookTarget {
            cart: cart_id,
            at_handlebar: hit.tag == ColliderTag::Handlebar,
            rollable: self.sensor.is_rollable(physics, cart),
            fallen_over,
            point: hit.point,
        };
        trace!(cart = cart_id.0, handlebar = target.at_handlebar, "look target");
        self.current = Some(target);
        Some(target)
    }
}

fn deactivate(carts: &mut CartRegistry, id: CartId, events: &mut EventQueue) {
    if let Some(cart) = carts.get_mut(id) {
        if outline::deactivate(cart) {
            events.push(InteractionEvent::OutlineDeactivated(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cart::{Cart, Material, ShaderId},
        config::CartConfig,
        outline::has_outline,
        physics::{
            mock::{MockBody, MockPhysics},
            BodyId,
        },
    };

    fn setup() -> (MockPhysics, CartRegistry, LookTargetResolver) {
        let mut physics = MockPhysics::new();
        let mut carts = CartRegistry::new();
        for id in 1..=2 {
            let body = BodyId(10 + id);
            physics.insert(body, MockBody::dynamic(Vec3::ZERO, 20.0));
            carts
                .insert(
                    Cart::new(CartId(id), body, Material::new("o", ShaderId(9)))
                        .with_wheel(Vec3::ZERO, 0.1)
                        .with_wheel(Vec3::ZERO, 0.1)
                        .with_part("frame", vec![Material::new("steel", ShaderId(1))]),
                )
                .unwrap();
        }
        let resolver = LookTargetResolver::new(
            3.0,
            LayerMask::INTERACTABLE,
            RollabilitySensor::from_config(&CartConfig::default()),
        );
        (physics, carts, resolver)
    }

    fn ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::FORWARD)
    }

    #[test]
    fn outline_follows_the_ray() {
        let (mut physics, mut carts, mut resolver) = setup();
        let mut events = EventQueue::default();

        physics.look_at(BodyId(11), ColliderTag::Body);
        let t = resolver
            .resolve(&physics, &mut carts, &ray(), false, &mut events)
            .unwrap();
        assert_eq!(t.cart, CartId(1));
        assert!(!t.at_handlebar);
        assert!(has_outline(carts.get(CartId(1)).unwrap()));

        physics.look_at(BodyId(12), ColliderTag::Handlebar);
        let t = resolver
            .resolve(&physics, &mut carts, &ray(), false, &mut events)
            .unwrap();
        assert!(t.at_handlebar);
        assert!(!has_outline(carts.get(CartId(1)).unwrap()));
        assert!(has_outline(carts.get(CartId(2)).unwrap()));

        physics.look_away();
        assert!(resolver
            .resolve(&physics, &mut carts, &ray(), false, &mut events)
            .is_none());
        assert!(!has_outline(carts.get(CartId(2)).unwrap()));
        assert_eq!(resolver.last_looked_at(), None);
        assert_eq!(
            events.drain(),
            vec![
                InteractionEvent::OutlineActivated(CartId(1)),
                InteractionEvent::OutlineDeactivated(CartId(1)),
                InteractionEvent::OutlineActivated(CartId(2)),
                InteractionEvent::OutlineDeactivated(CartId(2)),
            ]
        );
    }

    #[test]
    fn no_outline_while_holding() {
        let (mut physics, mut carts, mut resolver) = setup();
        let mut events = EventQueue::default();
        physics.look_at(BodyId(11), ColliderTag::Body);
        resolver.resolve(&physics, &mut carts, &ray(), true, &mut events);
        assert!(!has_outline(carts.get(CartId(1)).unwrap()));
        assert!(events.is_empty());
    }

    #[test]
    fn miss_without_previous_target_is_quiet() {
        let (physics, mut carts, mut resolver) = setup();
        let mut events = EventQueue::default();
        assert!(resolver
            .resolve(&physics, &mut carts, &ray(), false, &mut events)
            .is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn non_cart_hit_counts_as_miss() {
        let (mut physics, mut carts, mut resolver) = setup();
        let mut events = EventQueue::default();
        physics.look_at(BodyId(11), ColliderTag::Body);
        resolver.resolve(&physics, &mut carts, &ray(), false, &mut events);
        physics.look_at(BodyId(99), ColliderTag::Untagged);
        assert!(resolver
            .resolve(&physics, &mut carts, &ray(), false, &mut events)
            .is_none());
        assert!(!has_outline(carts.get(CartId(1)).unwrap()));
    }

    #[test]
    fn reports_rollable_and_fallen_over() {
        let (mut physics, mut carts, mut resolver) = setup();
        let mut events = EventQueue::default();
        physics.grounded.insert((BodyId(11), 0), false);
        physics.grounded.insert((BodyId(11), 1), false);
        physics.bodies.get_mut(&BodyId(11)).unwrap().rotation.roll = 80.0;
        physics.look_at(BodyId(11), ColliderTag::Body);
        let t = resolver
            .resolve(&physics, &mut carts, &ray(), false, &mut events)
            .unwrap();
        assert!(t.rollable);
        assert!(t.fallen_over);
    }
}

//! Carts and the cart registry.
//!
//! A cart is a rigid body with wheel contacts (the first two are the steerable
//! front pair), a set of visual parts that can be outlined, and optional links
//! to the carts coupled in front of and behind it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{error::SetupError, math::Vec3, physics::BodyId};

/// Opaque cart id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CartId(pub u64);

/// Shader identity. Materials are matched by shader when removing outlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub shader: ShaderId,
}

impl Material {
    pub fn new(name: impl Into<String>, shader: ShaderId) -> Self {
        Self {
            name: name.into(),
            shader,
        }
    }
}

/// Material list of one renderable sub-part, owned by the renderer.
pub trait MaterialSlots {
    fn materials(&self) -> &[Material];
    fn set_materials(&mut self, materials: Vec<Material>);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshPart {
    pub name: String,
    pub materials: Vec<Material>,
}

impl MaterialSlots for MeshPart {
    fn materials(&self) -> &[Material] {
        &self.materials
    }

    fn set_materials(&mut self, materials: Vec<Material>) {
        self.materials = materials;
    }
}

/// Wheel contact point in cart space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wheel {
    pub local_offset: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub body: BodyId,
    pub wheels: Vec<Wheel>,
    pub parts: Vec<MeshPart>,
    /// Highlight material appended to every part while outlined.
    pub outline_material: Material,
    #[serde(skip)]
    pub(crate) outlined: bool,
    #[serde(default)]
    pub in_front: Option<CartId>,
    #[serde(default)]
    pub behind: Option<CartId>,
}

impl Cart {
    pub fn new(id: CartId, body: BodyId, outline_material: Material) -> Self {
        Self {
            id,
            body,
            wheels: Vec::new(),
            parts: Vec::new(),
            outline_material,
            outlined: false,
            in_front: None,
            behind: None,
        }
    }

    pub fn with_wheel(mut self, local_offset: Vec3, radius: f32) -> Self {
        self.wheels.push(Wheel {
            local_offset,
            radius,
        });
        self
    }

    pub fn with_part(mut self, name: impl Into<String>, materials: Vec<Material>) -> Self {
        self.parts.push(MeshPart {
            name: name.into(),
            materials,
        });
        self
    }

    /// Indices of the steerable wheels.
    pub fn front_wheels(&self) -> std::ops::Range<usize> {
        0..self.wheels.len().min(2)
    }
}

/// All carts known to the controller.
#[derive(Debug, Default)]
pub struct CartRegistry {
    carts: BTreeMap<CartId, Cart>,
    by_body: HashMap<BodyId, CartId>,
}

impl CartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cart: Cart) -> Result<(), SetupError> {
        if self.carts.contains_key(&cart.id) {
            return Err(SetupError::DuplicateCart(cart.id));
        }
        if self.by_body.contains_key(&cart.body) {
            return Err(SetupError::DuplicateBody(cart.body));
        }
        if cart.wheels.len() < 2 {
            return Err(SetupError::TooFewWheels {
                cart: cart.id,
                wheels: cart.wheels.len(),
            });
        }
        self.by_body.insert(cart.body, cart.id);
        self.carts.insert(cart.id, cart);
        Ok(())
    }

    pub fn get(&self, id: CartId) -> Option<&Cart> {
        self.carts.get(&id)
    }

    pub fn get_mut(&mut self, id: CartId) -> Option<&mut Cart> {
        self.carts.get_mut(&id)
    }

    /// Maps a ray-hit body back to its cart.
    pub fn by_body(&self, body: BodyId) -> Option<CartId> {
        self.by_body.get(&body).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cart> {
        self.carts.values()
    }

    pub fn len(&self) -> usize {
        self.carts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    /// Couples `back` behind `front`, replacing any previous couplings of the
    /// two touching ends.
    pub fn link(&mut self, front: CartId, back: CartId) -> Result<(), SetupError> {
        if front == back {
            return Err(SetupError::SelfLink(front));
        }
        for id in [front, back] {
            if !self.carts.contains_key(&id) {
                return Err(SetupError::UnknownCart(id));
            }
        }
        let old_behind = self.carts.get(&front).and_then(|c| c.behind);
        let old_front = self.carts.get(&back).and_then(|c| c.in_front);
        if let Some(c) = old_behind.and_then(|id| self.carts.get_mut(&id)) {
            c.in_front = None;
        }
        if let Some(c) = old_front.and_then(|id| self.carts.get_mut(&id)) {
            c.behind = None;
        }
        if let Some(c) = self.carts.get_mut(&front) {
            c.behind = Some(back);
        }
        if let Some(c) = self.carts.get_mut(&back) {
            c.in_front = Some(front);
        }
        Ok(())
    }

    /// Detaches a cart from both neighbors.
    pub fn unlink(&mut self, id: CartId) {
        let Some(cart) = self.carts.get_mut(&id) else {
            return;
        };
        let (front, back) = (cart.in_front.take(), cart.behind.take());
        if let Some(c) = front.and_then(|f| self.carts.get_mut(&f)) {
            c.behind = None;
        }
        if let Some(c) = back.and_then(|b| self.carts.get_mut(&b)) {
            c.in_front = None;
        }
    }

    /// The train containing `id`, ordered from its front-most cart.
    pub fn train(&self, id: CartId) -> Vec<CartId> {
        let mut head = id;
        let mut guard = self.carts.len();
        while let Some(front) = self.carts.get(&head).and_then(|c| c.in_front) {
            if front == id || guard == 0 {
                break;
            }
            head = front;
            guard -= 1;
        }

        let mut train = Vec::new();
        let mut cursor = Some(head);
        while let Some(current) = cursor {
            if train.contains(&current) || !self.carts.contains_key(&current) {
                break;
            }
            train.push(current);
            cursor = self.carts.get(&current).and_then(|c| c.behind);
        }
        train
    }
}

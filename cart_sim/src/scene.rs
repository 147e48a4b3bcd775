//! Scene description and builder.
//!
//! A scene is the player plus a set of carts, described in JSON. Cart bodies
//! share one shape: a basket box on the interactable layer, a handlebar bar on
//! the local -X side, and four wheels with the front pair on local +X.

use std::path::Path;

use anyhow::Context;
use cart_shared::{
    cart::{Cart, CartId, CartRegistry, Material, ShaderId},
    math::Vec3,
    physics::{BodyId, ColliderTag, LayerMask},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::SandboxConfig,
    sandbox::{SandboxBody, SandboxWorld},
};

pub const OUTLINE_SHADER: ShaderId = ShaderId(100);

pub const BASKET_CENTER: Vec3 = Vec3::new(0.0, 0.6, 0.0);
pub const BASKET_HALF_EXTENTS: Vec3 = Vec3::new(0.5, 0.4, 0.35);
pub const HANDLEBAR_CENTER: Vec3 = Vec3::new(-0.55, 1.0, 0.0);
pub const HANDLEBAR_HALF_EXTENTS: Vec3 = Vec3::new(0.05, 0.05, 0.35);
pub const WHEEL_RADIUS: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDesc {
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default = "default_player_mass")]
    pub mass: f32,
}

fn default_player_mass() -> f32 {
    70.0
}

impl Default for PlayerDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            mass: default_player_mass(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDesc {
    pub id: u64,
    pub position: Vec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default = "default_cart_mass")]
    pub mass: f32,
    /// Cart this one is coupled behind.
    #[serde(default)]
    pub behind: Option<u64>,
}

fn default_cart_mass() -> f32 {
    25.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub player: PlayerDesc,
    #[serde(default)]
    pub carts: Vec<CartDesc>,
}

impl Default for SceneDesc {
    /// One cart straight ahead with its handlebar facing the player, a second
    /// off to the right.
    fn default() -> Self {
        Self {
            player: PlayerDesc::default(),
            carts: vec![
                CartDesc {
                    id: 1,
                    position: Vec3::new(0.0, 0.0, 1.0),
                    yaw: -90.0,
                    mass: default_cart_mass(),
                    behind: None,
                },
                CartDesc {
                    id: 2,
                    position: Vec3::new(3.0, 0.0, 1.0),
                    yaw: 0.0,
                    mass: 18.5,
                    behind: None,
                },
            ],
        }
    }
}

/// Everything the simulation needs from a built scene.
pub struct BuiltScene {
    pub world: SandboxWorld,
    pub player: BodyId,
    pub carts: CartRegistry,
}

impl SceneDesc {
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse scene {}", path.display()))
    }

    pub fn build(&self, physics: SandboxConfig) -> anyhow::Result<BuiltScene> {
        let mut world = SandboxWorld::new(physics);
        let player = world.add_body(player_body(&self.player));

        let mut carts = CartRegistry::new();
        for desc in &self.carts {
            let body = world.add_body(cart_body(desc));
            let cart = cart_for(desc, body);
            world.attach_wheels(body, &cart.wheels);
            carts
                .insert(cart)
                .with_context(|| format!("add cart {}", desc.id))?;
            debug!(cart = desc.id, body = body.0, "spawned cart");
        }
        for desc in &self.carts {
            if let Some(front) = desc.behind {
                carts
                    .link(CartId(front), CartId(desc.id))
                    .with_context(|| format!("link cart {} behind {}", desc.id, front))?;
            }
        }

        info!(carts = carts.len(), bodies = world.body_count(), "scene built");
        Ok(BuiltScene {
            world,
            player,
            carts,
        })
    }
}

fn player_body(desc: &PlayerDesc) -> SandboxBody {
    SandboxBody::new(desc.position, desc.yaw, desc.mass).with_collider(
        Vec3::new(0.0, 0.9, 0.0),
        Vec3::new(0.3, 0.9, 0.3),
        LayerMask::PLAYER,
        ColliderTag::Untagged,
    )
}

fn cart_body(desc: &CartDesc) -> SandboxBody {
    SandboxBody::new(desc.position, desc.yaw, desc.mass)
        .with_collider(
            BASKET_CENTER,
            BASKET_HALF_EXTENTS,
            LayerMask::INTERACTABLE,
            ColliderTag::Body,
        )
        .with_collider(
            HANDLEBAR_CENTER,
            HANDLEBAR_HALF_EXTENTS,
            LayerMask::INTERACTABLE,
            ColliderTag::Handlebar,
        )
}

fn cart_for(desc: &CartDesc, body: BodyId) -> Cart {
    let mut cart = Cart::new(
        CartId(desc.id),
        body,
        Material::new("outline", OUTLINE_SHADER),
    )
    .with_part(
        "basket",
        vec![
            Material::new("wire", ShaderId(1)),
            Material::new("decal", ShaderId(2)),
        ],
    )
    .with_part("handlebar", vec![Material::new("plastic", ShaderId(3))]);
    for (x, z) in [(0.4, 0.3), (0.4, -0.3), (-0.4, 0.3), (-0.4, -0.3)] {
        cart = cart.with_wheel(Vec3::new(x, WHEEL_RADIUS, z), WHEEL_RADIUS);
    }
    cart
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_shared::physics::PhysicsBackend;

    #[test]
    fn default_scene_builds_resting_carts() {
        let scene = SceneDesc::default().build(SandboxConfig::default()).unwrap();
        assert_eq!(scene.carts.len(), 2);
        for cart in scene.carts.iter() {
            assert_eq!(cart.front_wheels(), 0..2);
            assert!((0..4).all(|i| scene.world.wheel_grounded(cart.body, i)));
        }
        assert!(scene.world.body(scene.player).is_some());
    }

    #[test]
    fn json_scene_with_links() {
        let json = r#"{
            "carts": [
                { "id": 1, "position": { "x": 0.0, "y": 0.0, "z": 2.0 } },
                { "id": 2, "position": { "x": 0.0, "y": 0.0, "z": 3.0 }, "behind": 1 },
                { "id": 3, "position": { "x": 0.0, "y": 0.0, "z": 4.0 }, "behind": 2 }
            ]
        }"#;
        let scene = SceneDesc::from_json_str(json)
            .unwrap()
            .build(SandboxConfig::default())
            .unwrap();
        assert_eq!(
            scene.carts.train(CartId(3)),
            vec![CartId(1), CartId(2), CartId(3)]
        );
    }

    #[test]
    fn duplicate_cart_ids_are_rejected() {
        let mut desc = SceneDesc::default();
        desc.carts[1].id = 1;
        let err = desc.build(SandboxConfig::default()).err().unwrap();
        assert!(format!("{err:#}").contains("registered twice"));
    }
}

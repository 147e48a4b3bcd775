//! Headless sandbox physics.
//!
//! Just enough rigid-body simulation to exercise the controller without an
//! engine: gravity, a ground plane at `y = 0`, velocity integration, ground
//! friction, simple wheel drive, and ray casts against box colliders.
//!
//! Body origins sit at the bottom of the body, so a body rests when
//! `position.y == 0`. Colliders follow body yaw only.
//! Bodies do not collide with each other.

use std::collections::BTreeMap;

use cart_shared::{
    cart::Wheel,
    math::{wrap_degrees, Euler, Ray, Vec3},
    physics::{BodyId, ColliderTag, LayerMask, PhysicsBackend, RayHit, RigidBody},
};
use tracing::trace;

use crate::config::SandboxConfig;

/// Body id reported for ground plane hits.
pub const GROUND: BodyId = BodyId(0);

/// Wheel bottoms within this distance of the ground count as touching it.
const CONTACT_EPSILON: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCollider {
    /// Center in body-local space.
    pub center: Vec3,
    pub half_extents: Vec3,
    pub layer: LayerMask,
    pub tag: ColliderTag,
}

#[derive(Debug, Clone)]
pub struct SandboxBody {
    pub position: Vec3,
    pub rotation: Euler,
    pub linear_velocity: Vec3,
    /// Degrees per second.
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub kinematic: bool,
    pub uses_gravity: bool,
    pub colliders: Vec<BoxCollider>,
}

impl SandboxBody {
    pub fn new(position: Vec3, yaw: f32, mass: f32) -> Self {
        Self {
            position,
            rotation: Euler::from_yaw(yaw),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            kinematic: false,
            uses_gravity: true,
            colliders: Vec::new(),
        }
    }

    pub fn with_collider(
        mut self,
        center: Vec3,
        half_extents: Vec3,
        layer: LayerMask,
        tag: ColliderTag,
    ) -> Self {
        self.colliders.push(BoxCollider {
            center,
            half_extents,
            layer,
            tag,
        });
        self
    }

    /// Body-local point to world space, using the full orientation.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.position + rotate(self.rotation, local)
    }

    fn is_grounded(&self) -> bool {
        self.position.y <= CONTACT_EPSILON
    }
}

impl RigidBody for SandboxBody {
    fn position(&self) -> Vec3 {
        self.position
    }
    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }
    fn rotation(&self) -> Euler {
        self.rotation
    }
    fn set_rotation(&mut self, rotation: Euler) {
        self.rotation = rotation;
    }
    fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }
    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }
    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }
    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }
    fn mass(&self) -> f32 {
        self.mass
    }
    fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
    }
    fn is_kinematic(&self) -> bool {
        self.kinematic
    }
    fn set_kinematic(&mut self, kinematic: bool) {
        self.kinematic = kinematic;
    }
    fn uses_gravity(&self) -> bool {
        self.uses_gravity
    }
    fn set_uses_gravity(&mut self, enabled: bool) {
        self.uses_gravity = enabled;
    }

    // Kinematic bodies are moved by their owner only.
    fn apply_velocity_change(&mut self, delta: Vec3) {
        if !self.kinematic {
            self.linear_velocity += delta;
        }
    }

    fn apply_torque(&mut self, torque: Vec3) {
        if !self.kinematic && self.mass > 0.0 {
            self.angular_velocity += torque / self.mass;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WheelState {
    wheel: Wheel,
    motor_torque: f32,
    steer_angle: f32,
}

pub struct SandboxWorld {
    cfg: SandboxConfig,
    bodies: BTreeMap<BodyId, SandboxBody>,
    wheels: BTreeMap<BodyId, Vec<WheelState>>,
    next_id: u64,
}

impl SandboxWorld {
    pub fn new(cfg: SandboxConfig) -> Self {
        Self {
            cfg,
            bodies: BTreeMap::new(),
            wheels: BTreeMap::new(),
            next_id: GROUND.0 + 1,
        }
    }

    pub fn add_body(&mut self, body: SandboxBody) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.insert(id, body);
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<SandboxBody> {
        self.wheels.remove(&id);
        self.bodies.remove(&id)
    }

    pub fn attach_wheels(&mut self, body: BodyId, wheels: &[Wheel]) {
        let states = wheels
            .iter()
            .map(|&wheel| WheelState {
                wheel,
                motor_torque: 0.0,
                steer_angle: 0.0,
            })
            .collect();
        self.wheels.insert(body, states);
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// World-space center of the first collider on `body` carrying `tag`.
    pub fn collider_center(&self, body: BodyId, tag: ColliderTag) -> Option<Vec3> {
        let b = self.bodies.get(&body)?;
        let collider = b.colliders.iter().find(|c| c.tag == tag)?;
        Some(b.position + collider.center.rotate_yaw(b.rotation.yaw))
    }

    /// Integrates every dynamic body by `dt_sec`.
    pub fn step(&mut self, dt_sec: f32) {
        let Self {
            cfg, bodies, wheels, ..
        } = self;
        for (id, body) in bodies.iter_mut() {
            let drive = wheels.get_mut(id);
            if body.kinematic {
                if let Some(states) = drive {
                    clear_commands(states);
                }
                continue;
            }
            if body.uses_gravity {
                body.linear_velocity += cfg.gravity * dt_sec;
            }
            if let Some(states) = drive {
                apply_wheel_drive(body, states, dt_sec);
                clear_commands(states);
            }

            body.position += body.linear_velocity * dt_sec;
            let spin = body.angular_velocity * dt_sec;
            body.rotation = Euler {
                pitch: body.rotation.pitch + spin.x,
                yaw: wrap_degrees(body.rotation.yaw + spin.y),
                roll: body.rotation.roll + spin.z,
            };
            body.angular_velocity = body.angular_velocity * (1.0 - cfg.angular_damping * dt_sec).max(0.0);

            if body.position.y <= 0.0 {
                body.position.y = 0.0;
                if body.linear_velocity.y < 0.0 {
                    body.linear_velocity.y = 0.0;
                }
            }
            if body.is_grounded() {
                let keep = (1.0 - cfg.ground_friction * dt_sec).max(0.0);
                let v = body.linear_velocity;
                body.linear_velocity = Vec3::new(v.x * keep, v.y, v.z * keep);
            }
        }
    }
}

fn clear_commands(states: &mut [WheelState]) {
    for s in states {
        s.motor_torque = 0.0;
        s.steer_angle = 0.0;
    }
}

/// Grounded wheels push the body along its local +X axis; the mean front
/// steer angle sets a bicycle-model yaw rate.
fn apply_wheel_drive(body: &mut SandboxBody, states: &[WheelState], dt_sec: f32) {
    let grounded: Vec<&WheelState> = states
        .iter()
        .filter(|s| wheel_bottom(body, &s.wheel) <= CONTACT_EPSILON)
        .collect();
    if grounded.is_empty() || body.mass <= 0.0 {
        return;
    }
    let forward = Vec3::RIGHT.rotate_yaw(body.rotation.yaw);
    let thrust: f32 = grounded
        .iter()
        .map(|s| s.motor_torque / s.wheel.radius.max(0.01))
        .sum();
    body.linear_velocity += forward * (thrust / body.mass * dt_sec);

    let front = &states[..states.len().min(2)];
    let steer = front.iter().map(|s| s.steer_angle).sum::<f32>() / front.len().max(1) as f32;
    let wheelbase = wheelbase(states);
    if steer != 0.0 && wheelbase > 0.0 {
        let speed = body.linear_velocity.dot(forward);
        let yaw_rate = speed * steer.to_radians().tan() / wheelbase;
        body.angular_velocity.y = yaw_rate.to_degrees();
    }
}

fn wheelbase(states: &[WheelState]) -> f32 {
    let (Some(front), Some(rear)) = (states.first(), states.last()) else {
        return 0.0;
    };
    (front.wheel.local_offset.x - rear.wheel.local_offset.x).abs()
}

fn wheel_bottom(body: &SandboxBody, wheel: &Wheel) -> f32 {
    body.local_to_world(wheel.local_offset).y - wheel.radius
}

/// Roll about Z, then pitch about X, then yaw about Y.
fn rotate(e: Euler, v: Vec3) -> Vec3 {
    let (sr, cr) = e.roll.to_radians().sin_cos();
    let v = Vec3::new(v.x * cr - v.y * sr, v.x * sr + v.y * cr, v.z);
    let (sp, cp) = e.pitch.to_radians().sin_cos();
    let v = Vec3::new(v.x, v.y * cp - v.z * sp, v.y * sp + v.z * cp);
    v.rotate_yaw(e.yaw)
}

fn axes(v: Vec3) -> [f32; 3] {
    [v.x, v.y, v.z]
}

fn unit(axis: usize) -> Vec3 {
    match axis {
        0 => Vec3::RIGHT,
        1 => Vec3::UP,
        _ => Vec3::FORWARD,
    }
}

/// Slab test against an origin-centered box. Returns entry distance and
/// box-local surface normal.
fn ray_box(origin: Vec3, dir: Vec3, half: Vec3) -> Option<(f32, Vec3)> {
    let (o, d, h) = (axes(origin), axes(dir), axes(half));
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut normal = Vec3::ZERO;
    for axis in 0..3 {
        if d[axis].abs() < 1e-8 {
            if o[axis].abs() > h[axis] {
                return None;
            }
            continue;
        }
        let mut near = (-h[axis] - o[axis]) / d[axis];
        let mut far = (h[axis] - o[axis]) / d[axis];
        let mut sign = -1.0;
        if near > far {
            std::mem::swap(&mut near, &mut far);
            sign = 1.0;
        }
        if near > t_min {
            t_min = near;
            normal = unit(axis) * sign;
        }
        t_max = t_max.min(far);
        if t_min > t_max {
            return None;
        }
    }
    if t_max < 0.0 {
        return None;
    }
    if t_min < 0.0 {
        // Origin inside the box.
        return Some((0.0, -dir));
    }
    Some((t_min, normal))
}

impl PhysicsBackend for SandboxWorld {
    type Body = SandboxBody;

    fn body(&self, id: BodyId) -> Option<&SandboxBody> {
        self.bodies.get(&id)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut SandboxBody> {
        self.bodies.get_mut(&id)
    }

    fn raycast(&self, ray: &Ray, max_distance: f32, layers: LayerMask) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        let mut consider = |hit: RayHit| {
            if hit.distance <= max_distance && best.map_or(true, |b| hit.distance < b.distance) {
                best = Some(hit);
            }
        };

        if layers.contains(LayerMask::GROUND) && ray.direction.y < 0.0 && ray.origin.y >= 0.0 {
            let t = ray.origin.y / -ray.direction.y;
            consider(RayHit {
                body: GROUND,
                point: ray.at(t),
                normal: Vec3::UP,
                distance: t,
                tag: ColliderTag::Untagged,
            });
        }

        for (&id, body) in &self.bodies {
            let yaw = body.rotation.yaw;
            let local_dir = ray.direction.rotate_yaw(-yaw);
            for collider in body.colliders.iter().filter(|c| c.layer.intersects(layers)) {
                let local_origin = (ray.origin - body.position).rotate_yaw(-yaw) - collider.center;
                if let Some((t, normal)) = ray_box(local_origin, local_dir, collider.half_extents) {
                    consider(RayHit {
                        body: id,
                        point: ray.at(t),
                        normal: normal.rotate_yaw(yaw),
                        distance: t,
                        tag: collider.tag,
                    });
                }
            }
        }
        if let Some(hit) = &best {
            trace!(body = hit.body.0, distance = hit.distance, tag = ?hit.tag, "ray hit");
        }
        best
    }

    fn wheel_grounded(&self, body: BodyId, wheel: usize) -> bool {
        let (Some(b), Some(state)) = (
            self.bodies.get(&body),
            self.wheels.get(&body).and_then(|w| w.get(wheel)),
        ) else {
            return false;
        };
        wheel_bottom(b, &state.wheel) <= CONTACT_EPSILON
    }

    fn drive_wheel(&mut self, body: BodyId, wheel: usize, motor_torque: f32, steer_angle: f32) {
        if let Some(state) = self.wheels.get_mut(&body).and_then(|w| w.get_mut(wheel)) {
            state.motor_torque = motor_torque;
            state.steer_angle = steer_angle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SandboxWorld {
        SandboxWorld::new(SandboxConfig::default())
    }

    fn crate_box(position: Vec3) -> SandboxBody {
        SandboxBody::new(position, 0.0, 10.0)
            .with_collider(
                Vec3::new(0.0, 0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.5),
                LayerMask::INTERACTABLE,
                ColliderTag::Body,
            )
            .with_collider(
                Vec3::new(-0.6, 1.0, 0.0),
                Vec3::new(0.05, 0.05, 0.3),
                LayerMask::INTERACTABLE,
                ColliderTag::Handlebar,
            )
    }

    fn wheels() -> Vec<Wheel> {
        [(0.4, 0.3), (0.4, -0.3), (-0.4, 0.3), (-0.4, -0.3)]
            .into_iter()
            .map(|(x, z)| Wheel {
                local_offset: Vec3::new(x, 0.1, z),
                radius: 0.1,
            })
            .collect()
    }

    #[test]
    fn falling_body_comes_to_rest_on_ground() {
        let mut w = world();
        let id = w.add_body(crate_box(Vec3::new(0.0, 2.0, 0.0)));
        for _ in 0..200 {
            w.step(0.02);
        }
        let b = w.body(id).unwrap();
        assert_eq!(b.position.y, 0.0);
        assert_eq!(b.linear_velocity.y, 0.0);
    }

    #[test]
    fn kinematic_body_ignores_gravity_and_impulses() {
        let mut w = world();
        let id = w.add_body(crate_box(Vec3::new(0.0, 1.0, 0.0)));
        {
            let b = w.body_mut(id).unwrap();
            b.set_kinematic(true);
            b.apply_velocity_change(Vec3::new(5.0, 0.0, 0.0));
            b.apply_torque(Vec3::new(0.0, 5.0, 0.0));
        }
        w.step(0.1);
        let b = w.body(id).unwrap();
        assert_eq!(b.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(b.linear_velocity, Vec3::ZERO);
        assert_eq!(b.angular_velocity, Vec3::ZERO);
    }

    #[test]
    fn ray_reports_nearest_tagged_collider() {
        let mut w = world();
        let id = w.add_body(crate_box(Vec3::new(0.0, 0.0, 2.0)));

        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.0), Vec3::FORWARD);
        let hit = w.raycast(&ray, 5.0, LayerMask::INTERACTABLE).unwrap();
        assert_eq!(hit.body, id);
        assert_eq!(hit.tag, ColliderTag::Body);
        assert!((hit.distance - 1.5).abs() < 1e-4);
        assert!((hit.normal.z + 1.0).abs() < 1e-4);

        // Handlebar sits at local -X.
        let ray = Ray::new(Vec3::new(-2.0, 1.0, 2.0), Vec3::RIGHT);
        let hit = w.raycast(&ray, 5.0, LayerMask::INTERACTABLE).unwrap();
        assert_eq!(hit.tag, ColliderTag::Handlebar);
        assert!((hit.distance - 1.35).abs() < 1e-4);
    }

    #[test]
    fn ray_respects_layers_and_distance() {
        let mut w = world();
        w.add_body(crate_box(Vec3::new(0.0, 0.0, 2.0)));
        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.0), Vec3::FORWARD);
        assert!(w.raycast(&ray, 1.0, LayerMask::INTERACTABLE).is_none());
        assert!(w.raycast(&ray, 5.0, LayerMask::PLAYER).is_none());

        let down = Ray::new(Vec3::new(0.0, 1.6, 0.0), Vec3::DOWN);
        let hit = w.raycast(&down, 5.0, LayerMask::GROUND).unwrap();
        assert_eq!(hit.body, GROUND);
        assert!((hit.distance - 1.6).abs() < 1e-4);
    }

    #[test]
    fn ray_follows_body_yaw() {
        let mut w = world();
        let mut body = crate_box(Vec3::new(0.0, 0.0, 2.0));
        body.rotation = Euler::from_yaw(-90.0);
        w.add_body(body);
        // Local -X now faces the origin.
        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::FORWARD);
        let hit = w.raycast(&ray, 5.0, LayerMask::INTERACTABLE).unwrap();
        assert_eq!(hit.tag, ColliderTag::Handlebar);
    }

    #[test]
    fn wheel_contact_tracks_pose() {
        let mut w = world();
        let id = w.add_body(crate_box(Vec3::ZERO));
        w.attach_wheels(id, &wheels());
        assert!((0..4).all(|i| w.wheel_grounded(id, i)));
        assert!(!w.wheel_grounded(id, 9));

        w.body_mut(id).unwrap().position.y = 1.0;
        assert!((0..4).all(|i| !w.wheel_grounded(id, i)));

        // Tipped onto its side: only one pair touches.
        let b = w.body_mut(id).unwrap();
        b.position.y = 0.0;
        b.rotation.roll = 30.0;
        let airborne = (0..4).filter(|&i| !w.wheel_grounded(id, i)).count();
        assert_eq!(airborne, 2);
    }

    #[test]
    fn wheel_drive_pushes_along_local_x() {
        let mut w = world();
        let id = w.add_body(crate_box(Vec3::ZERO));
        w.attach_wheels(id, &wheels());
        for i in 0..4 {
            w.drive_wheel(id, i, 1.0, 0.0);
        }
        w.step(0.02);
        let v = w.body(id).unwrap().linear_velocity;
        assert!(v.x > 0.0);
        assert!(v.z.abs() < 1e-5);

        // Commands last one step.
        let before = w.body(id).unwrap().linear_velocity.x;
        w.step(0.02);
        assert!(w.body(id).unwrap().linear_velocity.x < before);
    }
}

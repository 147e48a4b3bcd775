//! Player/cart controller.
//!
//! Ties the components together on two cadences:
//! - [`CartController::frame`] runs once per rendered frame: samples input and
//!   rotates the camera.
//! - [`CartController::fixed_step`] runs once per physics step, in this order:
//!   look target, grab/release transition, held-cart forces, player force,
//!   velocity clamp.
//!
//! Grab and release presses seen during frames are latched until the next
//! fixed step consumes them, so a press is never lost between steps and never
//! handled twice.

use tracing::{debug, info, warn};

use crate::{
    cart::CartRegistry,
    config::ControllerConfig,
    error::SetupError,
    event::{EventQueue, InteractionEvent},
    grab::{GrabSession, GrabState, GrabStateMachine, Transition},
    input::{InputSnapshot, InputSource},
    locomotion::{CartSteering, Locomotion},
    look::LookModel,
    look_target::{LookTarget, LookTargetResolver},
    math::{Euler, Vec3},
    physics::{BodyId, PhysicsBackend, RigidBody},
    player::Player,
    rollability::RollabilitySensor,
};

pub struct CartController {
    cfg: ControllerConfig,
    player: Player,
    carts: CartRegistry,
    resolver: LookTargetResolver,
    grab: GrabStateMachine,
    locomotion: Locomotion,
    look: LookModel,
    pending: InputSnapshot,
    events: EventQueue,
    tick: u64,
}

impl CartController {
    /// Validates the config and checks every referenced body exists.
    pub fn new<P: PhysicsBackend>(
        cfg: ControllerConfig,
        player_body: BodyId,
        carts: CartRegistry,
        physics: &P,
    ) -> Result<Self, SetupError> {
        cfg.validate()?;
        if physics.body(player_body).is_none() {
            return Err(SetupError::MissingBody(player_body));
        }
        if carts.by_body(player_body).is_some() {
            return Err(SetupError::DuplicateBody(player_body));
        }
        if let Some(cart) = carts.iter().find(|c| physics.body(c.body).is_none()) {
            return Err(SetupError::MissingBody(cart.body));
        }

        let sensor = RollabilitySensor::from_config(&cfg.cart);
        let resolver = LookTargetResolver::new(
            cfg.grab.max_distance_grab,
            cfg.grab.interactable_layer,
            sensor,
        );
        let grab = GrabStateMachine::new(cfg.grab.clone(), CartSteering::new(&cfg.cart));
        let player = Player::new(
            player_body,
            cfg.movement.velocity_limit,
            cfg.look.eye_height,
        );
        info!(player = player_body.0, carts = carts.len(), "controller ready");

        Ok(Self {
            locomotion: Locomotion::new(&cfg.movement),
            look: LookModel::new(cfg.look.clone()),
            cfg,
            player,
            carts,
            resolver,
            grab,
            pending: InputSnapshot::default(),
            events: EventQueue::default(),
            tick: 0,
        })
    }

    /// Per-frame input sampling and camera rotation.
    pub fn frame<P: PhysicsBackend, I: InputSource + ?Sized>(
        &mut self,
        physics: &mut P,
        input: &mut I,
        dt_sec: f32,
    ) {
        let sample = input.sample();
        self.pending = InputSnapshot {
            grab: self.pending.grab || sample.grab,
            release: self.pending.release || sample.release,
            ..sample
        };

        let delta = self.look.delta(sample.look, dt_sec);
        if !delta.pitch.is_finite() || !delta.yaw.is_finite() {
            warn!(?delta, "skipping non-finite look delta");
            return;
        }
        let Some(body) = physics.body_mut(self.player.body) else {
            self.missing_player();
            return;
        };
        let (pitch, yaw) = self
            .look
            .apply(self.player.pitch, body.rotation().yaw, delta);
        self.player.pitch = pitch;
        body.set_rotation(Euler::from_yaw(yaw));
    }

    /// Sets the view directly. Pitch is clamped and yaw wrapped like mouse look.
    pub fn aim<P: PhysicsBackend>(&mut self, physics: &mut P, pitch: f32, yaw: f32) {
        let Some(body) = physics.body_mut(self.player.body) else {
            self.missing_player();
            return;
        };
        let (pitch, yaw) = self.look.apply(pitch, yaw, Default::default());
        self.player.pitch = pitch;
        body.set_rotation(Euler::from_yaw(yaw));
    }

    /// Turns the view towards a world point.
    pub fn look_at_point<P: PhysicsBackend>(&mut self, physics: &mut P, point: Vec3) {
        let Some(eye) = physics.body(self.player.body).map(|b| self.player.eye_position(b)) else {
            self.missing_player();
            return;
        };
        let to = point - eye;
        let flat = to.horizontal().len();
        let yaw = to.x.atan2(to.z).to_degrees();
        let pitch = (-to.y).atan2(flat).to_degrees();
        self.aim(physics, pitch, yaw);
    }

    /// One physics step.
    pub fn fixed_step<P: PhysicsBackend>(&mut self, physics: &mut P, dt_sec: f32) {
        self.tick += 1;
        let input = self.pending;
        self.pending.grab = false;
        self.pending.release = false;

        let Some(view_ray) = physics.body(self.player.body).map(|b| self.player.view_ray(b)) else {
            self.missing_player();
            return;
        };

        let target = self.resolver.resolve(
            physics,
            &mut self.carts,
            &view_ray,
            self.grab.is_holding(),
            &mut self.events,
        );

        let transition = self.grab.evaluate(
            physics,
            &mut self.carts,
            &self.player,
            target,
            &input,
            &mut self.events,
        );
        if transition != Transition::None {
            debug!(tick = self.tick, ?transition, "grab transition");
        }

        let force = self.locomotion.compute_force(&input, dt_sec);
        self.player.force_to_apply = force;

        self.grab.update_held(
            physics,
            &self.carts,
            &self.player,
            &input,
            force,
            &mut self.events,
        );

        let Some(body) = physics.body_mut(self.player.body) else {
            self.missing_player();
            return;
        };
        let on_player = Locomotion::force_on_player(force, self.grab.is_pushing_handlebars());
        self.locomotion.apply(body, on_player, &mut self.events);
        self.locomotion.clamp_velocity(body);
    }

    fn missing_player(&mut self) {
        warn!(body = self.player.body.0, "player body missing");
        self.events
            .push(InteractionEvent::BodyMissing(self.player.body));
    }

    pub fn state(&self) -> GrabState {
        self.grab.state()
    }

    pub fn session(&self) -> Option<&GrabSession> {
        self.grab.session()
    }

    pub fn look_target(&self) -> Option<LookTarget> {
        self.resolver.current()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn carts(&self) -> &CartRegistry {
        &self.carts
    }

    pub fn carts_mut(&mut self) -> &mut CartRegistry {
        &mut self.carts
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    /// Fixed steps run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Last computed player force in player space.
    pub fn force_to_apply(&self) -> Vec3 {
        self.player.force_to_apply()
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        self.events.drain()
    }
}

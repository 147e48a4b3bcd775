//! Headless simulation runner.
//!
//! Drives a [`CartController`] against the sandbox on two cadences: input and
//! camera once per frame, interaction and physics once per fixed tick. Input
//! comes from console commands instead of devices.
//!
//! Console commands:
//!   status                        - Show state, player and held cart
//!   look <cart> [body|handlebar]  - Aim the view at a cart
//!   grab | release                - Press the grab or release button once
//!   move <strafe> <forward>       - Hold movement axes (0 0 to stop)
//!   rotate <axis>                 - Hold the lift-rotate axis
//!   turn <degrees>                - Turn the player
//!   link <front> <back> | unlink <cart>
//!   quit                          - Stop the runner

use std::{path::Path, time::Duration};

use anyhow::{bail, Context};
use cart_shared::{
    cart::CartId,
    controller::CartController,
    event::InteractionEvent,
    input::{InputSnapshot, InputSource},
    physics::{ColliderTag, PhysicsBackend, RigidBody},
};
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    config::SimConfig,
    sandbox::SandboxWorld,
    scene::SceneDesc,
};

/// Slack for accumulated float error when counting frames and ticks.
const CADENCE_EPSILON: f32 = 1e-5;

/// Input assembled from console commands. Button presses last one sample.
#[derive(Debug, Default)]
pub struct ConsoleInput {
    held: InputSnapshot,
    grab: bool,
    release: bool,
}

impl ConsoleInput {
    pub fn press_grab(&mut self) {
        self.grab = true;
    }

    pub fn press_release(&mut self) {
        self.release = true;
    }

    pub fn set_move(&mut self, strafe: f32, forward: f32) {
        self.held.strafe = strafe.clamp(-1.0, 1.0);
        self.held.forward = forward.clamp(-1.0, 1.0);
    }

    pub fn set_lift_rotate(&mut self, axis: f32) {
        self.held.lift_rotate = axis.clamp(-1.0, 1.0);
    }
}

impl InputSource for ConsoleInput {
    fn sample(&mut self) -> InputSnapshot {
        InputSnapshot {
            grab: std::mem::take(&mut self.grab),
            release: std::mem::take(&mut self.release),
            ..self.held
        }
    }
}

pub struct Simulation {
    pub cfg: SimConfig,
    world: SandboxWorld,
    controller: CartController,
    input: ConsoleInput,
    tick: u64,
    frames: u64,
    frame_acc: f32,
    tick_acc: f32,
    running: bool,
    events: Vec<InteractionEvent>,

    /// Channel for console commands from stdin.
    console_rx: Option<mpsc::Receiver<String>>,
}

impl Simulation {
    /// Builds the scene named in the config, or the demo scene.
    pub fn new(cfg: SimConfig) -> anyhow::Result<Self> {
        let scene = match &cfg.scene {
            Some(path) => SceneDesc::load(Path::new(path))?,
            None => SceneDesc::default(),
        };
        Self::with_scene(cfg, &scene)
    }

    pub fn with_scene(cfg: SimConfig, scene: &SceneDesc) -> anyhow::Result<Self> {
        let built = scene.build(cfg.physics.clone())?;
        let controller = CartController::new(
            cfg.controller.clone(),
            built.player,
            built.carts,
            &built.world,
        )
        .context("create controller")?;
        info!(tick_hz = cfg.tick_hz, frame_hz = cfg.frame_hz, "simulation ready");
        Ok(Self {
            cfg,
            world: built.world,
            controller,
            input: ConsoleInput::default(),
            tick: 0,
            frames: 0,
            frame_acc: 0.0,
            tick_acc: 0.0,
            running: true,
            events: Vec::new(),
            console_rx: None,
        })
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn controller(&self) -> &CartController {
        &self.controller
    }

    pub fn world(&self) -> &SandboxWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SandboxWorld {
        &mut self.world
    }

    pub fn input_mut(&mut self) -> &mut ConsoleInput {
        &mut self.input
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Events collected since the last call.
    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advances wall time by `dt_sec`, running every frame and fixed tick
    /// that falls inside it. Frames run first so a press is seen by the
    /// tick that follows it.
    pub fn advance(&mut self, dt_sec: f32) -> anyhow::Result<()> {
        self.process_console_commands()?;
        let frame_dt = self.cfg.frame_dt();
        let tick_dt = self.cfg.tick_dt();

        self.frame_acc += dt_sec;
        while self.frame_acc + CADENCE_EPSILON >= frame_dt {
            self.frame_acc -= frame_dt;
            self.frame(frame_dt);
        }
        self.tick_acc += dt_sec;
        while self.tick_acc + CADENCE_EPSILON >= tick_dt {
            self.tick_acc -= tick_dt;
            self.step(tick_dt);
        }
        Ok(())
    }

    /// One rendered frame.
    pub fn frame(&mut self, dt_sec: f32) {
        self.controller.frame(&mut self.world, &mut self.input, dt_sec);
        self.frames += 1;
    }

    /// One fixed tick: controller first, then physics integration.
    pub fn step(&mut self, dt_sec: f32) {
        self.controller.fixed_step(&mut self.world, dt_sec);
        self.world.step(dt_sec);
        for event in self.controller.drain_events() {
            debug!(tick = self.tick, ?event, "interaction event");
            self.events.push(event);
        }
        self.tick += 1;
    }

    /// Runs `ticks` fixed ticks in real time.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(self.cfg.tick_dt());
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += dt;
            self.advance(dt.as_secs_f32())?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    fn process_console_commands(&mut self) -> anyhow::Result<()> {
        let lines: Vec<String> = if let Some(ref mut rx) = self.console_rx {
            let mut collected = Vec::new();
            while let Ok(line) = rx.try_recv() {
                collected.push(line);
            }
            collected
        } else {
            Vec::new()
        };

        for line in lines {
            match self.exec_console(&line) {
                Ok(out) => out.iter().for_each(|l| println!("{l}")),
                Err(e) => {
                    warn!(command = %line, error = %e, "console command failed");
                    println!("Error: {e:#}");
                }
            }
        }
        Ok(())
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        match tokens[0] {
            "status" => Ok(self.status()),
            "look" => {
                let Some(id) = tokens.get(1) else {
                    return Ok(vec!["Usage: look <cart> [body|handlebar]".to_string()]);
                };
                let cart = CartId(id.parse().context("cart id")?);
                let tag = match tokens.get(2).copied() {
                    None | Some("body") => ColliderTag::Body,
                    Some("handlebar") => ColliderTag::Handlebar,
                    Some(other) => bail!("unknown cart region '{other}'"),
                };
                let Some(body) = self.controller.carts().get(cart).map(|c| c.body) else {
                    return Ok(vec![format!("No cart {}", cart.0)]);
                };
                let Some(point) = self.world.collider_center(body, tag) else {
                    return Ok(vec![format!("Cart {} has no {:?} collider", cart.0, tag)]);
                };
                self.controller.look_at_point(&mut self.world, point);
                Ok(vec![format!("Looking at cart {} {:?}", cart.0, tag)])
            }
            "grab" => {
                self.input.press_grab();
                Ok(Vec::new())
            }
            "release" => {
                self.input.press_release();
                Ok(Vec::new())
            }
            "move" => {
                if tokens.len() < 3 {
                    return Ok(vec!["Usage: move <strafe> <forward>".to_string()]);
                }
                let strafe: f32 = tokens[1].parse().context("strafe axis")?;
                let forward: f32 = tokens[2].parse().context("forward axis")?;
                self.input.set_move(strafe, forward);
                Ok(Vec::new())
            }
            "rotate" => {
                let axis: f32 = tokens.get(1).unwrap_or(&"0").parse().context("rotate axis")?;
                self.input.set_lift_rotate(axis);
                Ok(Vec::new())
            }
            "turn" => {
                let Some(degrees) = tokens.get(1) else {
                    return Ok(vec!["Usage: turn <degrees>".to_string()]);
                };
                let degrees: f32 = degrees.parse().context("turn degrees")?;
                let pitch = self.controller.player().pitch();
                let Some(yaw) = self
                    .world
                    .body(self.controller.player().body)
                    .map(|b| b.rotation().yaw)
                else {
                    return Ok(vec!["Player body missing".to_string()]);
                };
                self.controller.aim(&mut self.world, pitch, yaw + degrees);
                Ok(Vec::new())
            }
            "link" => {
                if tokens.len() < 3 {
                    return Ok(vec!["Usage: link <front> <back>".to_string()]);
                }
                let front = CartId(tokens[1].parse().context("front cart id")?);
                let back = CartId(tokens[2].parse().context("back cart id")?);
                self.controller.carts_mut().link(front, back)?;
                let train = self.controller.carts().train(front);
                Ok(vec![format!("Train: {:?}", train.iter().map(|c| c.0).collect::<Vec<_>>())])
            }
            "unlink" => {
                let Some(id) = tokens.get(1) else {
                    return Ok(vec!["Usage: unlink <cart>".to_string()]);
                };
                let cart = CartId(id.parse().context("cart id")?);
                self.controller.carts_mut().unlink(cart);
                Ok(Vec::new())
            }
            "quit" | "exit" => {
                info!("Simulation shutting down");
                self.running = false;
                Ok(Vec::new())
            }
            other => Ok(vec![format!("Unknown command: {other}")]),
        }
    }

    fn status(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(format!("State: {:?}", self.controller.state()));
        out.push(format!("Tick: {} Frames: {}", self.tick, self.frames));
        if let Some(b) = self.world.body(self.controller.player().body) {
            let p = b.position();
            let v = b.linear_velocity();
            out.push(format!(
                "Player: pos=({:.2}, {:.2}, {:.2}) yaw={:.1} pitch={:.1} mass={:.2} speed={:.2}",
                p.x,
                p.y,
                p.z,
                b.rotation().yaw,
                self.controller.player().pitch(),
                b.mass(),
                v.horizontal().len()
            ));
        }
        match self.controller.look_target() {
            Some(t) => out.push(format!(
                "Looking at: cart {} handlebar={} rollable={} fallen_over={}",
                t.cart.0, t.at_handlebar, t.rollable, t.fallen_over
            )),
            None => out.push("Looking at: nothing".to_string()),
        }
        if let Some(s) = self.controller.session() {
            out.push(format!(
                "Holding: cart {} mode={:?} mass_added={:.2}",
                s.cart.0,
                s.mode,
                s.mass_added()
            ));
        }
        for cart in self.controller.carts().iter() {
            if let Some(b) = self.world.body(cart.body) {
                let p = b.position();
                out.push(format!(
                    "  cart {}: pos=({:.2}, {:.2}, {:.2}) yaw={:.1} kinematic={} gravity={}",
                    cart.id.0,
                    p.x,
                    p.y,
                    p.z,
                    b.rotation().yaw,
                    b.is_kinematic(),
                    b.uses_gravity()
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_shared::grab::GrabState;

    fn sim() -> Simulation {
        Simulation::new(SimConfig::default()).unwrap()
    }

    #[test]
    fn console_input_presses_last_one_sample() {
        let mut input = ConsoleInput::default();
        input.press_grab();
        input.set_move(2.0, -0.5);
        let first = input.sample();
        assert!(first.grab);
        assert_eq!(first.strafe, 1.0);
        let second = input.sample();
        assert!(!second.grab);
        assert_eq!(second.forward, -0.5);
    }

    #[test]
    fn advance_runs_both_cadences() {
        let mut s = sim();
        s.advance(1.0).unwrap();
        assert_eq!(s.tick(), 50);
        assert_eq!(s.frames(), 60);
    }

    #[test]
    fn console_grab_and_release_round_trip() {
        let mut s = sim();
        let player = s.controller().player().body;
        let mass = s.world().body(player).unwrap().mass();

        s.exec_console("look 1 handlebar").unwrap();
        s.exec_console("grab").unwrap();
        s.advance(0.1).unwrap();
        assert_eq!(s.controller().state(), GrabState::PushedByHandlebars);
        assert!(s.world().body(player).unwrap().mass() > mass);

        s.exec_console("release").unwrap();
        s.advance(0.1).unwrap();
        assert_eq!(s.controller().state(), GrabState::Free);
        assert_eq!(s.world().body(player).unwrap().mass(), mass);
    }

    #[test]
    fn bad_console_arguments_are_errors() {
        let mut s = sim();
        assert!(s.exec_console("look nine").is_err());
        assert!(s.exec_console("move 1 fast").is_err());
        assert_eq!(
            s.exec_console("dance").unwrap(),
            vec!["Unknown command: dance".to_string()]
        );
        assert!(s.exec_console("link 1 1").is_err());
    }

    #[test]
    fn quit_stops_the_runner() {
        let mut s = sim();
        s.exec_console("quit").unwrap();
        assert!(!s.is_running());
    }
}

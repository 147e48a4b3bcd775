//! Standalone simulation binary.
//!
//! Usage:
//!   cargo run -p cart_sim --bin sim -- [--config sim.json] [--scene scene.json] [--tick-hz 50] [--frame-hz 60]
//!
//! Runs the interaction core against the sandbox world. Type console commands
//! (`look 1 handlebar`, `grab`, `move 0 1`, `status`, `release`, `quit`) to drive it.

use std::env;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Context;
use cart_sim::{SimConfig, Simulation};
use tokio::sync::mpsc;
use tracing::info;

fn parse_args() -> anyhow::Result<SimConfig> {
    let args: Vec<String> = env::args().collect();
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => SimConfig::load(Path::new(&args[i + 1]))?,
        _ => SimConfig::default(),
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().unwrap_or(cfg.tick_hz);
                i += 2;
            }
            "--frame-hz" if i + 1 < args.len() => {
                cfg.frame_hz = args[i + 1].parse().unwrap_or(cfg.frame_hz);
                i += 2;
            }
            "--scene" if i + 1 < args.len() => {
                cfg.scene = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args().context("parse arguments")?;
    info!(tick_hz = cfg.tick_hz, frame_hz = cfg.frame_hz, scene = ?cfg.scene, "Starting simulation");

    let frame_interval = std::time::Duration::from_secs_f32(cfg.frame_dt());
    let mut sim = Simulation::new(cfg).context("create simulation")?;

    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    sim.set_console_input(console_rx);

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Simulation ready. Try 'look 1 handlebar', 'grab', 'move 0 1', 'status', 'quit'.");
    println!();

    let mut next_frame = tokio::time::Instant::now();
    while sim.is_running() {
        sim.advance(frame_interval.as_secs_f32())?;
        next_frame += frame_interval;
        tokio::time::sleep_until(next_frame).await;
    }
    info!(ticks = sim.tick(), frames = sim.frames(), "Simulation stopped");
    Ok(())
}

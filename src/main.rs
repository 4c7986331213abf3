//! Headless breakout runner
//!
//! Plays a session with an autopilot pointer, logging phase changes and the
//! final statistics.
//!
//! Usage:
//!   RUST_LOG=info cargo run -- --difficulty hard --frames 36000
//!   cargo run -- --levels levels.json --dump-state final.json

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use breakout::driver::{Clock, FrameDriver, HeadlessPlatform, StepClock, SystemClock};
use breakout::sim::LevelCatalog;
use breakout::{ConfigError, Difficulty, Settings, Tuning};
use clap::Parser;

#[derive(Parser)]
#[command(name = "breakout")]
#[command(about = "Run the breakout simulation headless with an autopilot paddle")]
struct Args {
    /// Settings JSON (field size, difficulty, frame rate, seed, volume)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Tuning JSON; missing fields keep their defaults
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Level catalog JSON (array of grids of kind codes)
    #[arg(long)]
    levels: Option<PathBuf>,

    /// easy, medium or hard (overrides the settings file)
    #[arg(long)]
    difficulty: Option<String>,

    /// Steps per second, 60 or 120 (overrides the settings file)
    #[arg(long)]
    fps: Option<u32>,

    /// RNG seed (overrides the settings file)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many steps
    #[arg(long, default_value_t = 60 * 60 * 10)]
    frames: u64,

    /// Pace steps against the wall clock instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Write a JSON snapshot of the final session here
    #[arg(long)]
    dump_state: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(name) = &args.difficulty {
        settings.difficulty = Difficulty::from_str(name)
            .ok_or_else(|| ConfigError::UnknownDifficulty(name.clone()))?;
    }
    if let Some(fps) = args.fps {
        settings.frame_rate = fps;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }

    let tuning = match &args.tuning {
        Some(path) => Tuning::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => Tuning::default(),
    };
    let catalog = match &args.levels {
        Some(path) => LevelCatalog::load(path)
            .with_context(|| format!("loading levels from {}", path.display()))?,
        None => LevelCatalog::builtin(),
    };

    if args.realtime {
        let driver = FrameDriver::new(settings, tuning, catalog, SystemClock::new())
            .context("invalid configuration")?;
        play(driver, &args)
    } else {
        let fps = settings.frame_rate;
        let driver = FrameDriver::new(settings, tuning, catalog, StepClock::new(fps))
            .context("invalid configuration")?;
        play(driver, &args)
    }
}

fn play<C: Clock>(mut driver: FrameDriver<C>, args: &Args) -> Result<()> {
    let mut platform = HeadlessPlatform::with_autopilot();
    let step = Duration::from_secs_f64(driver.session.settings.step_seconds());

    let mut frames = 0;
    while frames < args.frames && !driver.phase().is_terminal() {
        driver.step(&mut platform).context("level failed to load")?;
        frames += 1;
        if args.realtime {
            std::thread::sleep(step);
        }
    }

    let session = &driver.session;
    let stats = &session.stats;
    log::info!(
        "Finished after {} steps: {:?} on level {} with {} lives",
        frames,
        session.phase,
        session.level,
        session.lives()
    );
    log::info!(
        "Destroyed {} targets, {} bonus balls, {} beams, {} drops, {} levels cleared",
        stats.targets_destroyed,
        stats.bonus_balls,
        stats.beams_fired,
        stats.drops,
        stats.levels_cleared
    );
    log::info!(
        "{} cues played, {} draw requests over {} frames",
        platform.audio.played,
        platform.frames.requests,
        platform.frames.frames
    );

    if let Some(path) = &args.dump_state {
        let json = serde_json::to_string_pretty(session).context("serializing session")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Session snapshot written to {}", path.display());
    }

    Ok(())
}

//! Frame driver and platform boundary
//!
//! The driver owns a [`Session`] and a [`Clock`]. Each [`FrameDriver::step`]
//! resolves pending phase transitions, samples input, runs one simulation
//! step, describes the frame to the presentation sink and routes the step's
//! events to the platform (cues through the mixer, pointer warps).

use std::time::Instant;

use crate::audio::{AudioMixer, AudioSink, LogAudio};
use crate::error::{ConfigError, LevelError};
use crate::present::{FrameTally, PresentationSink};
use crate::settings::Settings;
use crate::sim::{FrameInput, GameEvent, GamePhase, LevelCatalog, Session, advance, tick};
use crate::tuning::Tuning;

/// Source of the wall-clock time the session's timers run on
pub trait Clock {
    /// Seconds since some fixed origin
    fn now(&self) -> f64;

    /// Called once after every executed step
    fn advance(&mut self) {}
}

/// Real time since construction
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Deterministic clock: exactly one step duration per executed step
#[derive(Debug, Clone)]
pub struct StepClock {
    frame: u64,
    fps: u32,
}

impl StepClock {
    pub fn new(fps: u32) -> Self {
        Self { frame: 0, fps }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Clock for StepClock {
    fn now(&self) -> f64 {
        self.frame as f64 / self.fps as f64
    }

    fn advance(&mut self) {
        self.frame += 1;
    }
}

/// One frame's input sample
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSample {
    /// Raw horizontal pointer position
    pub pointer_x: f32,
    pub kick: bool,
}

/// Everything outside the core: input, pointer control, sound and drawing
pub trait Platform {
    /// Sample input for the coming step
    fn sample(&mut self, session: &Session) -> InputSample;

    /// Move the physical pointer
    fn warp_pointer(&mut self, x: f32);

    fn audio(&mut self) -> &mut dyn AudioSink;

    fn presentation(&mut self) -> &mut dyn PresentationSink;
}

/// Raw pointer position that puts the hero paddle under the lowest falling
/// ball (or the hero ball when nothing is falling)
pub fn autopilot_pointer(session: &Session) -> f32 {
    let target = session
        .balls
        .iter()
        .filter(|b| b.vel.y > 0.0)
        .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
        .unwrap_or_else(|| session.hero())
        .pos
        .x;
    // Undo the mirroring the session applies to the sample
    session.effective_pointer(target)
}

/// Platform for headless runs: scripted or autopilot pointer, logged audio,
/// counted draw requests
#[derive(Debug, Default)]
pub struct HeadlessPlatform {
    pub pointer_x: f32,
    pub autopilot: bool,
    /// Kick on the next sample only
    pub kick: bool,
    /// Every warp request received, in order
    pub warps: Vec<f32>,
    pub audio: LogAudio,
    pub frames: FrameTally,
}

impl HeadlessPlatform {
    pub fn new(pointer_x: f32) -> Self {
        Self {
            pointer_x,
            ..Default::default()
        }
    }

    pub fn with_autopilot() -> Self {
        Self {
            autopilot: true,
            ..Default::default()
        }
    }
}

impl Platform for HeadlessPlatform {
    fn sample(&mut self, session: &Session) -> InputSample {
        if self.autopilot {
            self.pointer_x = autopilot_pointer(session);
        }
        InputSample {
            pointer_x: self.pointer_x,
            kick: std::mem::take(&mut self.kick),
        }
    }

    fn warp_pointer(&mut self, x: f32) {
        self.pointer_x = x;
        self.warps.push(x);
    }

    fn audio(&mut self) -> &mut dyn AudioSink {
        &mut self.audio
    }

    fn presentation(&mut self) -> &mut dyn PresentationSink {
        &mut self.frames
    }
}

/// Runs a session at a fixed cadence against a platform
pub struct FrameDriver<C: Clock> {
    pub session: Session,
    clock: C,
    mixer: AudioMixer,
    paused_at: Option<f64>,
}

impl<C: Clock> FrameDriver<C> {
    pub fn new(
        settings: Settings,
        tuning: Tuning,
        catalog: LevelCatalog,
        clock: C,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        tuning.validate()?;

        let mut mixer = AudioMixer::new();
        mixer.set_master_volume(settings.master_volume);
        mixer.set_sfx_volume(settings.sfx_volume);
        mixer.set_muted(settings.muted);

        log::info!(
            "Session: {}x{} {} @ {} fps, seed {:#x}, {} levels",
            settings.field_width,
            settings.field_height,
            settings.difficulty.as_str(),
            settings.frame_rate,
            settings.seed,
            catalog.len()
        );

        Ok(Self {
            session: Session::new(settings, tuning, catalog),
            clock,
            mixer,
            paused_at: None,
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn phase(&self) -> GamePhase {
        self.session.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Stop stepping; timers freeze until [`resume`](Self::resume)
    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(self.clock.now());
            log::info!("Paused");
        }
    }

    /// Resume stepping, pushing every deadline back by the paused time
    pub fn resume(&mut self) {
        if let Some(at) = self.paused_at.take() {
            let paused = (self.clock.now() - at).max(0.0);
            self.session.shift_deadlines(paused);
            log::info!("Resumed after {paused:.2}s");
        }
    }

    /// Execute one frame
    ///
    /// No-op while paused. Returns the phase after the step.
    pub fn step(&mut self, platform: &mut dyn Platform) -> Result<GamePhase, LevelError> {
        if self.paused_at.is_some() {
            return Ok(self.session.phase);
        }

        let now = self.clock.now();
        advance(&mut self.session, now)?;
        // A fresh level re-centres the pointer before it is sampled
        self.dispatch_events(platform);

        let sample = platform.sample(&self.session);
        tick(
            &mut self.session,
            &FrameInput {
                pointer_x: sample.pointer_x,
                now,
                kick: sample.kick,
            },
        );
        self.session.present(now, platform.presentation());
        self.dispatch_events(platform);

        self.clock.advance();
        Ok(self.session.phase)
    }

    fn dispatch_events(&mut self, platform: &mut dyn Platform) {
        for event in self.session.drain_events() {
            match event {
                GameEvent::Cue(cue) => self.mixer.play(platform.audio(), &cue),
                GameEvent::WarpPointer { x } => platform.warp_pointer(x),
                GameEvent::TargetDestroyed { .. } | GameEvent::PhaseChanged { .. } => {}
            }
        }
    }

    /// Step until the game ends or `max_frames` steps have run
    ///
    /// Returns the number of steps executed.
    pub fn run(
        &mut self,
        platform: &mut dyn Platform,
        max_frames: u64,
    ) -> Result<u64, LevelError> {
        let mut frames = 0;
        while frames < max_frames && !self.session.phase.is_terminal() {
            self.step(platform)?;
            frames += 1;
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Difficulty;
    use glam::Vec2;

    fn driver() -> FrameDriver<StepClock> {
        FrameDriver::new(
            Settings::default(),
            Tuning::default(),
            LevelCatalog::builtin(),
            StepClock::new(60),
        )
        .unwrap()
    }

    #[test]
    fn test_step_clock() {
        let mut clock = StepClock::new(120);
        assert_eq!(clock.now(), 0.0);
        for _ in 0..120 {
            clock.advance();
        }
        assert_eq!(clock.now(), 1.0);
        assert_eq!(clock.frame(), 120);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let settings = Settings {
            frame_rate: 50,
            ..Default::default()
        };
        let err = FrameDriver::new(
            settings,
            Tuning::default(),
            LevelCatalog::builtin(),
            StepClock::new(50),
        )
        .err();
        assert_eq!(err, Some(ConfigError::UnsupportedFrameRate { found: 50 }));
    }

    #[test]
    fn test_first_step_sets_up_level() {
        let mut d = driver();
        let mut p = HeadlessPlatform::new(300.0);
        assert_eq!(d.step(&mut p).unwrap(), GamePhase::Playing);
        // Level setup centres the pointer
        assert_eq!(p.warps, vec![960.0]);
        assert_eq!(d.session.paddles[0].x, 960.0);
        assert_eq!(p.frames.frames, 1);
        assert_eq!(d.clock().frame(), 1);
    }

    /// Clock the test moves by hand
    struct ManualClock(f64);

    impl Clock for ManualClock {
        fn now(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_pause_freezes_and_shifts() {
        let mut d = FrameDriver::new(
            Settings::default(),
            Tuning::default(),
            LevelCatalog::builtin(),
            ManualClock(0.0),
        )
        .unwrap();
        let mut p = HeadlessPlatform::new(960.0);
        d.step(&mut p).unwrap();
        d.clock.0 = 1.0;
        d.session.activate_extra_paddle(1.0);
        let deadline = d.session.stale_deadline;
        let expiry = d.session.paddles[1].expires_at.unwrap();
        let frames = p.frames.frames;

        d.pause();
        assert!(d.is_paused());
        d.clock.0 = 4.5;
        for _ in 0..10 {
            d.step(&mut p).unwrap();
        }
        assert_eq!(p.frames.frames, frames);

        d.resume();
        assert!(!d.is_paused());
        assert_eq!(d.session.stale_deadline, deadline + 3.5);
        assert_eq!(d.session.paddles[1].expires_at, Some(expiry + 3.5));
    }

    #[test]
    fn test_step_clock_stops_while_paused() {
        let mut d = driver();
        let mut p = HeadlessPlatform::new(960.0);
        d.step(&mut p).unwrap();
        let deadline = d.session.stale_deadline;
        d.pause();
        for _ in 0..10 {
            d.step(&mut p).unwrap();
        }
        assert_eq!(d.clock().frame(), 1);
        d.resume();
        assert_eq!(d.session.stale_deadline, deadline);
    }

    #[test]
    fn test_autopilot_tracks_falling_ball() {
        let mut d = driver();
        let mut p = HeadlessPlatform::with_autopilot();
        d.step(&mut p).unwrap();
        d.session.hero_mut().pos = Vec2::new(400.0, 700.0);
        d.session.hero_mut().vel = Vec2::new(0.0, 5.0);
        assert_eq!(autopilot_pointer(&d.session), 400.0);

        d.session.start_inversion(0.0);
        assert_eq!(autopilot_pointer(&d.session), 1520.0);
    }

    #[test]
    fn test_kick_is_one_shot() {
        let settings = Settings {
            difficulty: Difficulty::Hard,
            ..Default::default()
        };
        let mut d = FrameDriver::new(
            settings,
            Tuning::default(),
            LevelCatalog::builtin(),
            StepClock::new(60),
        )
        .unwrap();
        let mut p = HeadlessPlatform::new(960.0);
        d.step(&mut p).unwrap();
        p.kick = true;
        let sample = p.sample(&d.session);
        assert!(sample.kick);
        assert!(!p.sample(&d.session).kick);
    }

    #[test]
    fn test_muted_settings_silence_cues() {
        let settings = Settings {
            muted: true,
            ..Default::default()
        };
        let mut d = FrameDriver::new(
            settings,
            Tuning::default(),
            LevelCatalog::builtin(),
            StepClock::new(60),
        )
        .unwrap();
        let mut p = HeadlessPlatform::with_autopilot();
        d.run(&mut p, 600).unwrap();
        assert_eq!(p.audio.played, 0);
        assert_eq!(p.frames.frames, 600);
    }

    #[test]
    fn test_run_stops_at_frame_limit() {
        let mut d = driver();
        let mut p = HeadlessPlatform::with_autopilot();
        let frames = d.run(&mut p, 120).unwrap();
        assert_eq!(frames, 120);
        assert!(p.audio.played > 0 || p.frames.requests > 0);
    }
}

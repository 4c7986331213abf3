//! Game state and core simulation types
//!
//! Everything a session owns lives here: the entity pools, the per-session
//! arena geometry, the effect timers and the event queue the driver drains.
//! Entities never own each other; cross references go through indices.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::kinematics::{
    Aabb, WallContacts, bounce_off_walls, enforce_minimum_speed, floor_reentry,
};
use super::levels::{LevelCatalog, LevelLayout};
use crate::audio::{AudioCue, SoundEffect};
use crate::consts::*;
use crate::settings::Settings;
use crate::stereo_pan;
use crate::tuning::Tuning;

/// Current phase of the level/life state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Grid and hero are about to be (re)built
    LevelSetup,
    /// Active gameplay
    Playing,
    /// No destructible target remains
    LevelCleared,
    /// The hero ball dropped out of the field
    LifeLost,
    /// Out of lives
    GameOver,
    /// Final level cleared
    Win,
}

impl GamePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::Win)
    }
}

/// Remaining drop-lives of a ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lives {
    Finite(u32),
    /// Never consumed (intro balls)
    Immortal,
}

impl Lives {
    pub fn lose_one(&mut self) {
        if let Lives::Finite(n) = self {
            *n = n.saturating_sub(1);
        }
    }

    pub fn gain(&mut self, n: u32) {
        if let Lives::Finite(count) = self {
            *count += n;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Lives::Finite(0))
    }

    pub fn count(&self) -> Option<u32> {
        match self {
            Lives::Finite(n) => Some(*n),
            Lives::Immortal => None,
        }
    }
}

/// Per-session geometry derived from the field size and tuning
///
/// Sizes are fixed for the life of a session; per-level sizes live in
/// [`LevelLayout`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Arena {
    pub field: Vec2,
    /// Reference-to-actual scale (`field_height / 1080`)
    pub scale: f32,
    /// Fraction of a reference frame covered by one step
    pub step_fraction: f32,
    pub ball_radius: f32,
    /// Half extents of a paddle; `half.y` is also the end-cap radius
    pub paddle_half: Vec2,
    /// y of every paddle's top edge
    pub paddle_top: f32,
    /// Half extents of a beam sprite
    pub beam_half: Vec2,
    /// Half-width of the thin strip a beam collides with
    pub beam_hit_half_width: f32,
    /// Beam speed in pixels per reference frame
    pub beam_speed: f32,
}

impl Arena {
    pub fn new(settings: &Settings, tuning: &Tuning) -> Self {
        let h = settings.field_height;
        let ball_diameter = h * tuning.ball_height_pct / 100.0;
        let paddle_height = h * tuning.paddle_height_pct / 100.0;
        let beam_height = h * tuning.beam_height_pct / 100.0;
        let beam_half = Vec2::new(beam_height * tuning.beam_aspect, beam_height) * 0.5;
        Self {
            field: Vec2::new(settings.field_width, h),
            scale: settings.scale(),
            step_fraction: settings.step_fraction(),
            ball_radius: ball_diameter * 0.5,
            paddle_half: Vec2::new(paddle_height * tuning.paddle_aspect, paddle_height) * 0.5,
            paddle_top: h - paddle_height * tuning.paddle_lift,
            beam_half,
            beam_hit_half_width: (beam_half.x * 0.5).max(2.0),
            beam_speed: h / tuning.beam_speed_divisor,
        }
    }

    /// Stereo pan for a horizontal position in this field
    pub fn pan(&self, x: f32) -> f32 {
        stereo_pan(x, self.field.x)
    }
}

/// What one call to [`Ball::advance`] did at the field edges
#[derive(Debug, Clone, Copy, Default)]
pub struct BallMove {
    pub contacts: WallContacts,
    /// Fell out of the bottom and re-entered from a side
    pub dropped: bool,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub lives: Lives,
    /// Title-screen mode: damped bounces, reflective floor, no speed floor
    pub intro: bool,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, vel: Vec2, radius: f32, lives: Lives) -> Self {
        Self {
            id,
            pos,
            vel,
            radius,
            lives,
            intro: false,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::splat(self.radius))
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Multiply the velocity (a player "kick")
    pub fn kick(&mut self, ratio: f32) {
        self.vel *= ratio;
    }

    /// Move one step: speed floor, integration, walls and floor re-entry
    ///
    /// Outside intro mode the speed floor holds both before and after the move,
    /// so a slow re-entry is brought straight back up to it.
    pub fn advance(
        &mut self,
        arena: &Arena,
        tuning: &Tuning,
        floor: f32,
        rng: &mut impl Rng,
    ) -> BallMove {
        if !self.intro {
            self.vel = enforce_minimum_speed(self.vel, floor);
        }

        let step = arena.step_fraction;
        self.pos += self.vel * step;

        let damp = if self.intro {
            self.vel *= tuning.intro_drag.powf(step);
            tuning.intro_damping
        } else {
            1.0
        };

        let contacts = bounce_off_walls(
            &mut self.pos,
            &mut self.vel,
            self.radius,
            arena.field,
            damp,
            tuning.min_angle_ratio,
            self.intro,
        );

        let dropped = contacts.fell_out(self.intro);
        if dropped {
            let reentry = floor_reentry(
                rng,
                arena.field,
                tuning.reentry_height,
                tuning.reentry_speed,
                arena.scale,
            );
            self.pos = reentry.pos;
            self.vel = reentry.vel;
            self.lives.lose_one();
        }

        if !self.intro {
            self.vel = enforce_minimum_speed(self.vel, floor);
        }

        BallMove { contacts, dropped }
    }
}

/// A paddle: a rectangle with semicircular end caps, driven by the pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    /// 0 is the hero paddle; 1..=6 are the pooled extras
    pub id: u32,
    /// Center x
    pub x: f32,
    /// Top edge y
    pub top: f32,
    pub half: Vec2,
    /// Fixed horizontal offset from the pointer
    pub offset: f32,
    /// Positional delta over the last move
    pub vx: f32,
    /// Wall-clock expiry; `None` for the hero paddle
    pub expires_at: Option<f64>,
    /// Drawn with the inverted sprite while controls are mirrored
    pub inverted: bool,
}

impl Paddle {
    pub fn new(id: u32, arena: &Arena) -> Self {
        let slot = PADDLE_SLOTS.get(id as usize).copied().unwrap_or(0.0);
        Self {
            id,
            x: arena.field.x * 0.5,
            top: arena.paddle_top,
            half: arena.paddle_half,
            offset: slot * arena.paddle_half.x * 2.0,
            vx: 0.0,
            expires_at: None,
            inverted: false,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.x - self.half.x, self.top),
            Vec2::new(self.x + self.half.x, self.top + self.half.y * 2.0),
        )
    }

    /// Follow the pointer, keeping this paddle's slot offset
    pub fn track(&mut self, pointer_x: f32) {
        let x = pointer_x + self.offset;
        self.vx = x - self.x;
        self.x = x;
    }

    /// Bring a pooled paddle into play until `expires_at`
    pub fn activate(&mut self, pointer_x: f32, expires_at: f64) {
        self.expires_at = Some(expires_at);
        self.track(pointer_x);
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.expires_at.is_some_and(|t| now > t)
    }

    /// Draw alpha: opaque, fading to ~55 over the last `fade_seconds`
    pub fn alpha(&self, now: f64, fade_seconds: f64) -> u8 {
        match self.expires_at {
            Some(t) => {
                let remain = (t - now).max(0.0);
                if remain < fade_seconds {
                    (55.0 + 100.0 * remain).min(255.0) as u8
                } else {
                    255
                }
            }
            None => 255,
        }
    }
}

/// The nine target kinds, in level-code order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    Neutral,
    BonusBall,
    BonusPaddle,
    ExtraLife,
    Darken,
    Invert,
    Cascade,
    Indestructible,
    Barrage,
}

impl TargetKind {
    pub const ALL: [TargetKind; NUM_TARGET_KINDS] = [
        TargetKind::Neutral,
        TargetKind::BonusBall,
        TargetKind::BonusPaddle,
        TargetKind::ExtraLife,
        TargetKind::Darken,
        TargetKind::Invert,
        TargetKind::Cascade,
        TargetKind::Indestructible,
        TargetKind::Barrage,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Starting hit points
    pub fn hit_points(&self) -> i32 {
        match self {
            TargetKind::Neutral => 1,
            TargetKind::BonusBall => 3,
            TargetKind::BonusPaddle => 2,
            TargetKind::ExtraLife => 2,
            TargetKind::Darken => 4,
            TargetKind::Invert => 3,
            TargetKind::Cascade => 2,
            TargetKind::Indestructible => INDESTRUCTIBLE_HP,
            TargetKind::Barrage => 3,
        }
    }

    pub fn is_indestructible(&self) -> bool {
        *self == TargetKind::Indestructible
    }
}

/// Result of striking a target once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Already destroyed or bursting
    Ignored,
    /// Lost a hit point and is still standing
    Damaged,
    /// Indestructible; unchanged
    Deflected,
    /// Reached zero hit points on this strike
    Destroyed,
}

/// A grid target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Flat grid index (`row * columns + column`)
    pub id: u32,
    pub kind: TargetKind,
    /// Positive while alive; counts down through negatives while bursting
    pub hp: i32,
    pub center: Vec2,
    pub half: Vec2,
}

impl Target {
    pub fn new(id: u32, kind: TargetKind, center: Vec2, half: Vec2) -> Self {
        Self {
            id,
            kind,
            hp: kind.hit_points(),
            center,
            half,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Must be destroyed to clear the level
    pub fn counts_for_clear(&self) -> bool {
        !self.kind.is_indestructible()
    }

    /// Burst animation finished (never true for indestructible targets)
    pub fn is_gone(&self) -> bool {
        !self.kind.is_indestructible() && self.hp < -DESTROY_TICKS
    }

    pub fn is_bursting(&self) -> bool {
        !self.is_alive() && !self.is_gone()
    }

    /// Collision box; empty once the target is destroyed
    pub fn aabb(&self) -> Aabb {
        if self.is_alive() {
            Aabb::from_center(self.center, self.half)
        } else {
            Aabb::EMPTY
        }
    }

    /// Apply one strike; `kill` forces a destructible target straight to zero
    pub fn hit(&mut self, kill: bool) -> HitOutcome {
        if self.hp <= 0 {
            HitOutcome::Ignored
        } else if self.kind.is_indestructible() {
            HitOutcome::Deflected
        } else {
            self.hp = if kill { 0 } else { self.hp - 1 };
            if self.hp == 0 {
                HitOutcome::Destroyed
            } else {
                HitOutcome::Damaged
            }
        }
    }

    /// Advance the burst animation by one draw tick
    pub fn tick_burst(&mut self) {
        if self.is_bursting() {
            self.hp -= 1;
        }
    }

    /// Radius of the burst flash; shrinks from `half.y` to zero
    pub fn burst_radius(&self) -> Option<f32> {
        self.is_bursting()
            .then(|| self.half.y * (DESTROY_TICKS + self.hp).max(0) as f32 / DESTROY_TICKS as f32)
    }
}

/// A projectile fired upward during a barrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    pub pos: Vec2,
    pub vel: Vec2,
    pub half: Vec2,
    pub hit_half_width: f32,
    /// Fired by the hero paddle (drawn with the primary sprite)
    pub primary: bool,
}

impl Beam {
    pub fn new(pos: Vec2, arena: &Arena, primary: bool) -> Self {
        Self {
            pos,
            vel: Vec2::new(0.0, -arena.beam_speed),
            half: arena.beam_half,
            hit_half_width: arena.beam_hit_half_width,
            primary,
        }
    }

    /// Move one step; false once the beam has left the top edge
    pub fn advance(&mut self, step_fraction: f32) -> bool {
        self.pos += self.vel * step_fraction;
        self.pos.y > -self.half.y
    }

    /// Thin strip the beam collides with
    pub fn hit_box(&self) -> Aabb {
        Aabb::from_center(self.pos, Vec2::new(self.hit_half_width, self.half.y))
    }
}

/// Control-inversion timer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inversion {
    pub until: f64,
    /// Remaining-seconds mark of the next tick/restore cue
    pub next_cue: f64,
}

/// Side-effect requests for the outside world, drained once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Cue(AudioCue),
    /// Move the physical pointer to this x
    WarpPointer { x: f32 },
    TargetDestroyed { id: u32, kind: TargetKind },
    PhaseChanged { from: GamePhase, to: GamePhase },
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub targets_destroyed: u32,
    pub bonus_balls: u32,
    pub beams_fired: u32,
    pub drops: u32,
    pub levels_cleared: u32,
}

/// One game from level 1 to game over or win
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub settings: Settings,
    pub tuning: Tuning,
    #[serde(skip)]
    pub catalog: LevelCatalog,
    pub arena: Arena,
    pub layout: LevelLayout,
    pub phase: GamePhase,
    /// 1-based level index
    pub level: u32,
    /// Steps since the level was set up
    pub frame: u64,
    /// `balls[0]` is always the hero ball
    pub balls: Vec<Ball>,
    /// Active paddles, hero first, extras in activation order
    pub paddles: Vec<Paddle>,
    /// Inactive extra paddles, kept sorted by id
    pub paddle_pool: Vec<Paddle>,
    pub targets: Vec<Target>,
    pub beams: Vec<Beam>,
    /// Start of the current darkening fade
    pub darken_started: Option<f64>,
    pub inversion: Option<Inversion>,
    /// Beams are emitted while `now` is before this
    pub barrage_until: Option<f64>,
    /// Stale-play watchdog deadline
    pub stale_deadline: f64,
    /// Last raw pointer sample
    pub raw_pointer_x: f32,
    /// Pointer after inversion is applied
    pub pointer_x: f32,
    pub stats: SessionStats,
    #[serde(skip)]
    pub events: Vec<GameEvent>,
    #[serde(skip)]
    pub(crate) rng: Pcg32,
    next_ball_id: u32,
}

impl Session {
    /// Create a session waiting in `LevelSetup` for level 1
    pub fn new(settings: Settings, tuning: Tuning, catalog: LevelCatalog) -> Self {
        let arena = Arena::new(&settings, &tuning);
        let lives = tuning.starting_lives + settings.difficulty.bonus_lives();
        let hero = Ball::new(
            0,
            arena.field * 0.5,
            Vec2::ZERO,
            arena.ball_radius,
            Lives::Finite(lives),
        );
        let paddles = vec![Paddle::new(0, &arena)];
        let paddle_pool = (1..=EXTRA_PADDLES as u32)
            .map(|id| Paddle::new(id, &arena))
            .collect();
        let rng = Pcg32::seed_from_u64(settings.seed);
        let center = arena.field.x * 0.5;

        Self {
            layout: LevelLayout::empty(),
            settings,
            tuning,
            catalog,
            arena,
            phase: GamePhase::LevelSetup,
            level: 1,
            frame: 0,
            balls: vec![hero],
            paddles,
            paddle_pool,
            targets: Vec::new(),
            beams: Vec::new(),
            darken_started: None,
            inversion: None,
            barrage_until: None,
            stale_deadline: 0.0,
            raw_pointer_x: center,
            pointer_x: center,
            stats: SessionStats::default(),
            events: Vec::new(),
            rng,
            next_ball_id: 1,
        }
    }

    pub fn hero(&self) -> &Ball {
        &self.balls[0]
    }

    pub fn hero_mut(&mut self) -> &mut Ball {
        &mut self.balls[0]
    }

    /// Player lives (the hero ball's drop-lives)
    pub fn lives(&self) -> u32 {
        self.hero().lives.count().unwrap_or(u32::MAX)
    }

    pub fn is_inverted(&self) -> bool {
        self.inversion.is_some()
    }

    pub fn is_barrage_active(&self, now: f64) -> bool {
        self.barrage_until.is_some_and(|until| now < until)
    }

    /// Speed floor for the current level
    pub fn speed_floor(&self) -> f32 {
        super::kinematics::speed_floor(self.level, self.tuning.min_speed_offset, self.arena.scale)
    }

    /// Map a raw pointer sample through the current inversion state
    pub fn effective_pointer(&self, raw_x: f32) -> f32 {
        if self.is_inverted() {
            self.arena.field.x - raw_x
        } else {
            raw_x
        }
    }

    /// Targets still standing that must be destroyed to clear the level
    pub fn remaining_targets(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.counts_for_clear() && t.is_alive())
            .count()
    }

    pub fn allocate_ball_id(&mut self) -> u32 {
        let id = self.next_ball_id;
        self.next_ball_id += 1;
        id
    }

    pub fn push_cue(&mut self, effect: SoundEffect, x: f32, volume: Option<f32>) {
        let cue = AudioCue::new(effect, self.arena.pan(x), volume);
        self.events.push(GameEvent::Cue(cue));
    }

    pub fn set_phase(&mut self, to: GamePhase) {
        if self.phase != to {
            log::info!("Level {}: {:?} -> {:?}", self.level, self.phase, to);
            self.events.push(GameEvent::PhaseChanged {
                from: self.phase,
                to,
            });
            self.phase = to;
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Push every wall-clock deadline back by `paused` seconds
    pub fn shift_deadlines(&mut self, paused: f64) {
        self.stale_deadline += paused;
        if let Some(t) = self.darken_started.as_mut() {
            *t += paused;
        }
        if let Some(inv) = self.inversion.as_mut() {
            inv.until += paused;
        }
        if let Some(t) = self.barrage_until.as_mut() {
            *t += paused;
        }
        for paddle in self.paddles.iter_mut().chain(self.paddle_pool.iter_mut()) {
            if let Some(t) = paddle.expires_at.as_mut() {
                *t += paused;
            }
        }
    }

    /// Darkness overlay alpha at `now`, if a fade is running
    ///
    /// Ramps up at `darken_rate` per second (capped at opaque) for the hold
    /// window, then fades back out at the same rate.
    pub fn darkness(&self, now: f64) -> Option<u8> {
        let start = self.darken_started?;
        let rate = self.tuning.darken_rate as f64;
        let hold = self.tuning.darken_hold_seconds;
        let t = (now - start).max(0.0);
        let alpha = if t < hold {
            (rate * t).min(255.0)
        } else {
            255.0 - rate * (t - hold)
        };
        (alpha > 0.0 || t < hold).then(|| alpha.clamp(0.0, 255.0) as u8)
    }
}

//! Data-driven game balance
//!
//! Every gameplay constant lives here so a JSON file can rebalance the game
//! without touching the simulation. Speeds are in pixels per reference frame
//! at 1080 lines and get multiplied by the session scale; durations are in
//! seconds of wall-clock time.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What happens after the hero ball drops out of the field while the player
/// still has lives left (see DESIGN.md)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LifeLossPolicy {
    /// Keep the surviving targets and play on from the re-entry point
    #[default]
    KeepGrid,
    /// Rebuild the level's grid and serve the hero ball again
    RestartLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Ball kinematics ===
    /// Speed floor is `(level + min_speed_offset) * scale`
    pub min_speed_offset: f32,
    /// Minimum |vy/vx| after a side-wall bounce
    pub min_angle_ratio: f32,
    /// Bounce restitution in intro mode
    pub intro_damping: f32,
    /// Per-reference-frame velocity retention in intro mode
    pub intro_drag: f32,
    /// Speed multiplier applied by a kick
    pub kick_ratio: f32,
    /// Range of the random inward speed after a floor exit
    pub reentry_speed: (f32, f32),
    /// Re-entry height as a fraction of the field height
    pub reentry_height: f32,

    // === Cues ===
    /// Impact speed (reference units) at which cue volume saturates
    pub volume_speed_cap: f32,

    // === Sprite proportions (percent of field height) ===
    pub ball_height_pct: f32,
    pub paddle_height_pct: f32,
    /// Paddle width over paddle height
    pub paddle_aspect: f32,
    /// Paddle top sits this many paddle heights above the bottom edge
    pub paddle_lift: f32,
    pub beam_height_pct: f32,
    /// Beam sprite width over beam sprite height
    pub beam_aspect: f32,
    /// Beams travel one `field_height / beam_speed_divisor` per reference frame
    pub beam_speed_divisor: f32,

    // === Lives ===
    pub starting_lives: u32,
    pub bonus_ball_lives: u32,
    /// Drop-lives of a ball spawned by the stale-play watchdog
    pub watchdog_ball_lives: u32,
    pub life_loss_policy: LifeLossPolicy,

    // === Bonus balls ===
    /// Launch angle range from vertical, degrees
    pub bonus_angle_deg: (f32, f32),
    /// Fraction of the hero ball's speed given to a bonus ball
    pub bonus_speed_ratio: (f32, f32),

    // === Timers (seconds) ===
    pub inversion_seconds: f64,
    pub barrage_seconds: f64,
    pub stale_play_seconds: f64,
    pub extra_paddle_seconds: f64,
    /// Expiring paddles fade during this final window
    pub paddle_fade_seconds: f64,

    // === Darkening ===
    /// Overlay alpha gained (then lost) per second
    pub darken_rate: f32,
    /// Seconds spent darkening before the fade back out begins
    pub darken_hold_seconds: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            min_speed_offset: 1.5,
            min_angle_ratio: 0.35,
            intro_damping: 0.7,
            intro_drag: 0.999,
            kick_ratio: 1.25,
            reentry_speed: (1.0, 4.0),
            reentry_height: 0.8,

            volume_speed_cap: 50.0,

            ball_height_pct: 4.5,
            paddle_height_pct: 6.0,
            paddle_aspect: 4.0,
            paddle_lift: 1.3,
            beam_height_pct: 6.0,
            beam_aspect: 0.25,
            beam_speed_divisor: 60.0,

            starting_lives: 3,
            bonus_ball_lives: 2,
            watchdog_ball_lives: 3,
            life_loss_policy: LifeLossPolicy::KeepGrid,

            bonus_angle_deg: (5.0, 85.0),
            bonus_speed_ratio: (0.5, 1.0),

            inversion_seconds: 6.0,
            barrage_seconds: 6.0,
            stale_play_seconds: 10.0,
            extra_paddle_seconds: 10.0,
            paddle_fade_seconds: 2.0,

            darken_rate: 30.0,
            darken_hold_seconds: 10.0,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("ball_height_pct", self.ball_height_pct),
            ("paddle_height_pct", self.paddle_height_pct),
            ("paddle_aspect", self.paddle_aspect),
            ("beam_height_pct", self.beam_height_pct),
            ("beam_aspect", self.beam_aspect),
            ("beam_speed_divisor", self.beam_speed_divisor),
            ("volume_speed_cap", self.volume_speed_cap),
            ("kick_ratio", self.kick_ratio),
            ("darken_rate", self.darken_rate),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::InvalidTuning { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.intro_damping) {
            return Err(ConfigError::InvalidTuning {
                field: "intro_damping",
                value: self.intro_damping,
            });
        }
        if self.bonus_angle_deg.0 > self.bonus_angle_deg.1 {
            return Err(ConfigError::InvalidTuning {
                field: "bonus_angle_deg",
                value: self.bonus_angle_deg.0,
            });
        }
        if self.reentry_speed.0 > self.reentry_speed.1 {
            return Err(ConfigError::InvalidTuning {
                field: "reentry_speed",
                value: self.reentry_speed.0,
            });
        }
        if self.bonus_speed_ratio.0 > self.bonus_speed_ratio.1 {
            return Err(ConfigError::InvalidTuning {
                field: "bonus_speed_ratio",
                value: self.bonus_speed_ratio.0,
            });
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        if let Err(e) = tuning.validate() {
            log::warn!("Rejected tuning: {e}");
            return Err(e);
        }
        Ok(tuning)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }
}

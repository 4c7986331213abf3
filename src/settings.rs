//! Run settings
//!
//! Field geometry, difficulty and cadence for one session. Loaded from JSON
//! or built from defaults; everything here is fixed for the life of a session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{REFERENCE_FPS, REFERENCE_HEIGHT, SUPPORTED_FPS};
use crate::error::ConfigError;

/// Difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" | "0" => Some(Difficulty::Easy),
            "medium" | "med" | "1" => Some(Difficulty::Medium),
            "hard" | "2" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Numeric tier, 0 (easy) to 2 (hard)
    pub fn tier(&self) -> u32 {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    /// Lives granted on top of the starting lives
    pub fn bonus_lives(&self) -> u32 {
        2 - self.tier()
    }

    /// Divisor for the upward jitter a paddle adds (harder = less jitter)
    pub fn jitter_divisor(&self) -> f32 {
        (4 - self.tier()) as f32
    }

    /// Ten-entry table the `0` level placeholder draws its kind code from
    pub fn placeholder_codes(&self) -> [u8; 10] {
        match self {
            Difficulty::Easy => [0, 0, 1, 1, 2, 2, 2, 2, 2, 2],
            Difficulty::Medium => [0, 0, 0, 0, 1, 1, 1, 2, 2, 2],
            Difficulty::Hard => [0, 0, 0, 0, 0, 1, 1, 1, 2, 2],
        }
    }
}

/// Per-run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Field width in pixels
    pub field_width: f32,
    /// Field height in pixels
    pub field_height: f32,
    pub difficulty: Difficulty,
    /// Simulation steps per second (60 or 120)
    pub frame_rate: u32,
    /// Seed for the simulation RNG
    pub seed: u64,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            field_width: 1920.0,
            field_height: 1080.0,
            difficulty: Difficulty::Medium,
            frame_rate: REFERENCE_FPS,
            seed: 0x00C0_FFEE,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }
}

impl Settings {
    /// Reference-to-actual scale for speeds, offsets and sizes
    pub fn scale(&self) -> f32 {
        self.field_height / REFERENCE_HEIGHT
    }

    /// Fraction of a reference frame covered by one simulation step
    pub fn step_fraction(&self) -> f32 {
        REFERENCE_FPS as f32 / self.frame_rate as f32
    }

    /// Duration of one simulation step in seconds
    pub fn step_seconds(&self) -> f64 {
        1.0 / self.frame_rate as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_FPS.contains(&self.frame_rate) {
            return Err(ConfigError::UnsupportedFrameRate {
                found: self.frame_rate,
            });
        }
        if !(self.field_width > 0.0 && self.field_height > 0.0) {
            return Err(ConfigError::InvalidField {
                width: self.field_width,
                height: self.field_height,
            });
        }
        Ok(())
    }

    /// Parse and validate settings from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        if let Err(e) = settings.validate() {
            log::warn!("Rejected settings: {e}");
            return Err(e);
        }
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!(
            "Loaded settings from {}: {}x{} {} @ {} fps",
            path.display(),
            settings.field_width,
            settings.field_height,
            settings.difficulty.as_str(),
            settings.frame_rate
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!(Difficulty::from_str("EASY"), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_str("med"), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_str("2"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_str("nightmare"), None);
    }

    #[test]
    fn test_difficulty_tables() {
        assert_eq!(Difficulty::Easy.bonus_lives(), 2);
        assert_eq!(Difficulty::Hard.bonus_lives(), 0);
        assert_eq!(Difficulty::Easy.jitter_divisor(), 4.0);
        assert_eq!(Difficulty::Hard.jitter_divisor(), 2.0);
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert!(d.placeholder_codes().iter().all(|&c| c <= 2));
        }
    }

    #[test]
    fn test_scale_and_step() {
        let mut s = Settings {
            field_height: 540.0,
            ..Default::default()
        };
        assert!((s.scale() - 0.5).abs() < 1e-6);
        assert_eq!(s.step_fraction(), 1.0);
        s.frame_rate = 120;
        assert_eq!(s.step_fraction(), 0.5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = Settings::from_json(r#"{ "frame_rate": 120, "difficulty": "Hard" }"#).unwrap();
        assert_eq!(s.frame_rate, 120);
        assert_eq!(s.difficulty, Difficulty::Hard);
        assert_eq!(s.field_width, 1920.0);
    }

    #[test]
    fn test_rejects_bad_frame_rate() {
        let err = Settings::from_json(r#"{ "frame_rate": 75 }"#).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedFrameRate { found: 75 });
    }
}

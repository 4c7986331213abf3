//! Breakout - simulation core for a multi-ball brick-breaker
//!
//! Core modules:
//! - `sim`: Deterministic simulation (kinematics, collisions, targets, session)
//! - `driver`: Fixed-cadence frame driver and platform boundary
//! - `audio`: Sound cue vocabulary and the audio sink boundary
//! - `present`: Draw requests handed to the presentation sink
//! - `settings`: Per-run settings (field size, difficulty, frame rate)
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod driver;
pub mod error;
pub mod present;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{ConfigError, LevelError};
pub use settings::{Difficulty, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Field height every reference speed and size was tuned against
    pub const REFERENCE_HEIGHT: f32 = 1080.0;
    /// Velocities are expressed in pixels per reference frame (1/60 s)
    pub const REFERENCE_FPS: u32 = 60;
    /// Supported simulation cadences
    pub const SUPPORTED_FPS: [u32; 2] = [60, 120];

    /// Number of distinct target kinds
    pub const NUM_TARGET_KINDS: usize = 9;
    /// Hit-point sentinel carried by indestructible targets
    pub const INDESTRUCTIBLE_HP: i32 = 99;
    /// Draw ticks a destroyed target spends bursting before it is gone
    pub const DESTROY_TICKS: i32 = 20;

    /// Extra paddles pooled behind the hero paddle
    pub const EXTRA_PADDLES: usize = 6;
    /// Horizontal offsets (in paddle widths) of hero + extra paddles, by id
    pub const PADDLE_SLOTS: [f32; 7] = [0.0, -1.0, 1.0, -2.0, 2.0, -3.0, 3.0];

    /// Ball-ball cue volume saturates at this normal speed (sqrt domain)
    pub const BALL_CLICK_CAP: f32 = 8.0;
}

/// Stereo pan in [0, 1] for a horizontal position on a field of `width`
#[inline]
pub fn stereo_pan(x: f32, width: f32) -> f32 {
    if width <= 0.0 {
        return 0.5;
    }
    (x / width).clamp(0.0, 1.0)
}

/// Map an impact velocity to a cue volume in [0, 1]
///
/// Volume rises linearly with speed until `cap`, then saturates.
#[inline]
pub fn velocity_to_volume(vel: Vec2, cap: f32) -> f32 {
    if cap <= 0.0 {
        return 1.0;
    }
    vel.length().min(cap) / cap
}

/// Sign of `v` with zero treated as positive
#[inline]
pub(crate) fn sign_or_positive(v: f32) -> f32 {
    if v < 0.0 { -1.0 } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_pan() {
        assert_eq!(stereo_pan(0.0, 1920.0), 0.0);
        assert_eq!(stereo_pan(960.0, 1920.0), 0.5);
        assert_eq!(stereo_pan(5000.0, 1920.0), 1.0);
        assert_eq!(stereo_pan(100.0, 0.0), 0.5);
    }

    #[test]
    fn test_velocity_to_volume() {
        assert_eq!(velocity_to_volume(Vec2::new(3.0, 4.0), 10.0), 0.5);
        assert_eq!(velocity_to_volume(Vec2::new(30.0, 40.0), 10.0), 1.0);
        assert_eq!(velocity_to_volume(Vec2::ZERO, 10.0), 0.0);
    }
}

//! Sound cues
//!
//! The simulation never touches an audio device. It emits [`AudioCue`]s that
//! an [`AudioSink`] turns into sound; [`AudioMixer`] applies the run's volume
//! settings on the way through.

use serde::{Deserialize, Serialize};

use crate::sim::TargetKind;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Two balls collide
    BallHit,
    /// Ball hits a paddle
    PaddleHit,
    /// Ball hits a wall
    WallHit,
    /// Target hit but not destroyed
    TargetHit,
    /// Target destroyed (or an indestructible target struck)
    Explode(TargetKind),
    /// Ball fell off the bottom edge
    Drop,
    /// Beam fired; three variants for some variety
    Laser(u8),
    /// Once-a-second tick while controls are inverted
    Tick,
    /// One second before controls are restored
    Restore,
    /// Stale-play watchdog threw in a ball
    Bonus,
    /// Out of lives
    Die,
    /// Final level cleared
    Win,
}

/// A request to play one sound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioCue {
    pub effect: SoundEffect,
    /// Stereo position, 0.0 = left, 1.0 = right
    pub pan: f32,
    /// Optional volume in [0, 1]; `None` plays at the sound's own level
    pub volume: Option<f32>,
}

impl AudioCue {
    pub fn new(effect: SoundEffect, pan: f32, volume: Option<f32>) -> Self {
        Self {
            effect,
            pan: pan.clamp(0.0, 1.0),
            volume: volume.map(|v| v.clamp(0.0, 1.0)),
        }
    }

    /// Left/right channel gains for this cue's pan
    pub fn channel_gains(&self) -> (f32, f32) {
        let pan = self.pan.clamp(0.0, 1.0);
        ((1.0 - pan).max(0.0), pan.max(0.0))
    }
}

/// Consumer of sound cues; must not block
pub trait AudioSink {
    fn play(&mut self, cue: &AudioCue);
}

/// Sink that writes cues to the log (headless runs)
#[derive(Debug, Default)]
pub struct LogAudio {
    pub played: u64,
}

impl AudioSink for LogAudio {
    fn play(&mut self, cue: &AudioCue) {
        self.played += 1;
        let (left, right) = cue.channel_gains();
        log::trace!(
            "cue {:?} pan={:.2} vol={:?} (L {:.2} / R {:.2})",
            cue.effect,
            cue.pan,
            cue.volume,
            left,
            right
        );
    }
}

/// Applies master/sfx volume and mute before forwarding to a backend sink
#[derive(Debug)]
pub struct AudioMixer {
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl Default for AudioMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioMixer {
    pub fn new() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Scale a cue by the mixer volume and hand it to `sink`
    pub fn play(&self, sink: &mut dyn AudioSink, cue: &AudioCue) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let scaled = AudioCue {
            volume: Some(cue.volume.unwrap_or(1.0) * vol),
            ..*cue
        };
        sink.play(&scaled);
    }
}
